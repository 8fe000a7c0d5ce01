//! Native spreadsheet charts and the cell ranges feeding them.
//!
//! A chart only references cells, so every series is first written to a
//! block of columns on the sheet that hosts the chart.

use rust_xlsxwriter::{
    Chart, ChartFormat, ChartLine, ChartLineDashType, ChartMarker, ChartMarkerType, ChartType,
    Color, ColNum, RowNum, Worksheet, XlsxError,
};

/// A constant regulatory level drawn over a trend.
#[derive(Debug, Clone)]
pub struct ThresholdLine {
    pub value: f64,
    pub label: String,
    pub color: Color,
}

/// Location of a two-column (category, value) series on a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRange {
    pub sheet: String,
    pub category_col: ColNum,
    pub value_col: ColNum,
    pub first_row: RowNum,
    pub last_row: RowNum,
}

impl SeriesRange {
    /// Writes `points` under a header row starting at `(0, col)`.
    ///
    /// Returns `None` without writing anything when `points` is empty.
    pub fn write(
        worksheet: &mut Worksheet,
        sheet: &str,
        col: ColNum,
        headers: (&str, &str),
        points: &[(String, f64)],
    ) -> Result<Option<SeriesRange>, XlsxError> {
        if points.is_empty() {
            return Ok(None);
        }

        worksheet.write_string(0, col, headers.0)?;
        worksheet.write_string(0, col + 1, headers.1)?;
        for (i, (category, value)) in points.iter().enumerate() {
            let row = i as RowNum + 1;
            worksheet.write_string(row, col, category)?;
            worksheet.write_number(row, col + 1, *value)?;
        }

        Ok(Some(SeriesRange {
            sheet: sheet.to_string(),
            category_col: col,
            value_col: col + 1,
            first_row: 1,
            last_row: points.len() as RowNum,
        }))
    }

    fn categories(&self) -> (&str, RowNum, ColNum, RowNum, ColNum) {
        self.column(self.category_col)
    }

    fn column(&self, col: ColNum) -> (&str, RowNum, ColNum, RowNum, ColNum) {
        (self.sheet.as_str(), self.first_row, col, self.last_row, col)
    }
}

/// Line chart of a series over its categories.
pub fn trend_chart(range: &SeriesRange, title: &str, y_label: &str) -> Chart {
    let mut chart = Chart::new(ChartType::Line);
    chart
        .add_series()
        .set_name(y_label)
        .set_categories(range.categories())
        .set_values(range.column(range.value_col))
        .set_marker(ChartMarker::new().set_type(ChartMarkerType::Circle));
    chart.title().set_name(title);
    chart.y_axis().set_name(y_label);
    chart.legend().set_hidden();
    chart
}

/// The real trend in black with one dashed horizontal line per threshold.
///
/// Threshold values are written as constant columns right after the series.
pub fn threshold_chart(
    worksheet: &mut Worksheet,
    range: &SeriesRange,
    title: &str,
    y_label: &str,
    lines: &[ThresholdLine],
) -> Result<Chart, XlsxError> {
    let mut chart = Chart::new(ChartType::Line);
    chart
        .add_series()
        .set_name("Moyenne réelle")
        .set_categories(range.categories())
        .set_values(range.column(range.value_col))
        .set_marker(ChartMarker::new().set_type(ChartMarkerType::Circle))
        .set_format(ChartFormat::new().set_line(ChartLine::new().set_color(Color::Black)));

    for (i, line) in lines.iter().enumerate() {
        let col = range.value_col + 1 + i as ColNum;
        worksheet.write_string(0, col, line.label.as_str())?;
        for row in range.first_row..=range.last_row {
            worksheet.write_number(row, col, line.value)?;
        }

        chart
            .add_series()
            .set_name(line.label.as_str())
            .set_categories(range.categories())
            .set_values(range.column(col))
            .set_format(
                ChartFormat::new().set_line(
                    ChartLine::new()
                        .set_color(line.color)
                        .set_dash_type(ChartLineDashType::Dash),
                ),
            );
    }

    chart.title().set_name(title);
    chart.x_axis().set_name("Date");
    chart.y_axis().set_name(y_label);
    Ok(chart)
}

/// Column chart of counts per category.
pub fn bar_chart(range: &SeriesRange, title: &str) -> Chart {
    let mut chart = Chart::new(ChartType::Column);
    chart
        .add_series()
        .set_name(title)
        .set_categories(range.categories())
        .set_values(range.column(range.value_col));
    chart.title().set_name(title);
    chart.legend().set_hidden();
    chart
}
