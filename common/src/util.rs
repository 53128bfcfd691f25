use std::{fs, path::Path};

use eyre::{Context, Result};
use serde::Serialize;

/// Rounds `value` to `decimals` places and drops trailing zeros, `2.50` -> `2.5`.
pub fn format_value(value: f64, decimals: usize) -> String {
    let text = format!("{value:.decimals$}");
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text.as_str()
    };
    match text {
        "-0" => "0".to_owned(),
        other => other.to_owned(),
    }
}

/// Substitutes `{count}` in a chart title.
pub fn fill_title(template: &str, count: usize) -> String {
    template.replace("{count}", &count.to_string())
}

/// Writes the data behind a chart next to it, as `plot_data/<stem>.json`.
pub fn dump_plot_data<T: Serialize>(plot_path: &Path, stem: &str, data: &T) -> Result<()> {
    let plot_data_dir = plot_path.join("plot_data");
    if !plot_data_dir.exists() {
        fs::create_dir_all(&plot_data_dir)?;
    }
    let data_path = plot_data_dir.join(format!("{stem}.json"));
    fs::write(&data_path, serde_json::to_string_pretty(data)?)
        .context(format!("Write plot data {}", data_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_lose_trailing_zeros() {
        assert_eq!(format_value(2.5, 2), "2.5");
        assert_eq!(format_value(3.0, 2), "3");
        assert_eq!(format_value(0.123456, 5), "0.12346");
        assert_eq!(format_value(12.0, 0), "12");
        assert_eq!(format_value(-0.001, 2), "0");
        assert_eq!(format_value(-0.3, 0), "0");
    }

    #[test]
    fn titles_take_counts() {
        assert_eq!(fill_title("over {count} graphs", 36), "over 36 graphs");
        assert_eq!(fill_title("plain", 3), "plain");
    }
}
