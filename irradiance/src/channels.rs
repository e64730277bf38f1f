use std::{fs, path::Path};

use ndarray::ArrayView1;

/// Label of the last channel, the total irradiance.
pub const TOTAL_IRRADIANCE: &str = "tot_irr_megsa";

/// Channel names, one per line, in the instrument's line order.
pub const NAMES_FILE: &str = "name.txt";

/// The instrument's own names array, not read directly.
const NAMES_ARRAY: &str = "name.npy";

/// Positions, in the instrument's line list, of the spectral lines that were kept.
const KEPT_LINES: [usize; 14] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 14];

/// Human readable labels for the prediction channels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelNames {
    names: Vec<String>,
}

impl ChannelNames {
    /// Reads the line names from `<eve_root>/name.txt`, one per line.
    ///
    /// The instrument ships its names as a numpy string array (`name.npy`), which has to be
    /// exported to `name.txt` first. Falls back to generic labels when the file is missing or too
    /// short.
    pub fn load<P: AsRef<Path>>(eve_root: P) -> Self {
        let root = eve_root.as_ref();
        let path = root.join(NAMES_FILE);

        match fs::read_to_string(&path) {
            Ok(text) => Self::from_lines(text.lines()),
            Err(e) => {
                log::warn!("cannot read channel names from {}: {e}", path.display());
                if root.join(NAMES_ARRAY).exists() {
                    log::warn!(
                        "found {NAMES_ARRAY} in {}, export it one name per line to {NAMES_FILE}",
                        root.display()
                    );
                }
                Self::default()
            }
        }
    }

    /// Picks the kept lines out of the full line list and appends the total irradiance.
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let all: Vec<&str> = lines.into_iter().map(str::trim).collect();

        if all.len() <= KEPT_LINES[KEPT_LINES.len() - 1] {
            log::warn!("expected at least 15 line names, got {}", all.len());
            return Self::default();
        }

        let mut names: Vec<String> = KEPT_LINES.iter().map(|&i| all[i].to_string()).collect();
        names.push(TOTAL_IRRADIANCE.to_string());
        Self { names }
    }

    pub fn label(&self, channel: usize) -> String {
        self.names
            .get(channel)
            .cloned()
            .unwrap_or_else(|| format!("ch{channel}"))
    }

    /// Formats a per-channel percentage vector as `name: x.xx%` entries joined by `; `.
    pub fn format_errors(&self, errors: ArrayView1<f64>) -> String {
        errors
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{}: {e:.2}%", self.label(i)))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn skips_the_dropped_line_and_appends_total() {
        let lines: Vec<String> = (0..16).map(|i| format!(" line{i} ")).collect();
        let names = ChannelNames::from_lines(lines.iter().map(String::as_str));

        assert_eq!(names.label(12), "line12");
        assert_eq!(names.label(13), "line14");
        assert_eq!(names.label(14), TOTAL_IRRADIANCE);
        assert_eq!(names.label(15), "ch15");
    }

    #[test]
    fn short_list_falls_back_to_generic_labels() {
        let names = ChannelNames::from_lines(["a", "b"]);
        assert_eq!(names.label(0), "ch0");
    }

    #[test]
    fn formats_percentages() {
        let names = ChannelNames::default();
        assert_eq!(
            names.format_errors(array![1.234, 10.0].view()),
            "ch0: 1.23%; ch1: 10.00%"
        );
    }

    #[test]
    fn names_array_alone_gives_generic_labels() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("name.npy"), b"\x93NUMPY").unwrap();

        let names = ChannelNames::load(dir.path());
        assert_eq!(names, ChannelNames::default());
        assert_eq!(names.label(3), "ch3");
    }

    #[test]
    fn missing_file_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ChannelNames::load(dir.path()), ChannelNames::default());
    }
}
