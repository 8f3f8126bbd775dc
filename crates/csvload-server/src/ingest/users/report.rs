//! Age distribution report
//!
//! Runs after every ingestion attempt, whether the run committed or rolled back,
//! and summarizes every stored user that has an age.

use std::sync::Arc;
use tracing::{info, warn};

use super::storage::{AgeBandCount, UserStore};
use super::Result;

const REPORT_TITLE: &str = "--- Age Distribution Report ---";
const REPORT_FOOTER: &str = "---------------------------------";
const GROUP_COLUMN_WIDTH: usize = 12;

/// Fixed age bands, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeBand {
    /// age < 20
    Under20,
    /// 20 <= age <= 40
    From20To40,
    /// 40 < age <= 60
    From40To60,
    /// age > 60
    Over60,
}

impl AgeBand {
    pub const ALL: [AgeBand; 4] = [
        AgeBand::Under20,
        AgeBand::From20To40,
        AgeBand::From40To60,
        AgeBand::Over60,
    ];

    /// Label used both in the SQL grouping and in the rendered table
    pub fn label(self) -> &'static str {
        match self {
            AgeBand::Under20 => "< 20",
            AgeBand::From20To40 => "20 to 40",
            AgeBand::From40To60 => "40 to 60",
            AgeBand::Over60 => "> 60",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|band| band.label() == label)
    }
}

/// One row of the report
#[derive(Debug, Clone, PartialEq)]
pub struct BandShare {
    pub band: AgeBand,
    pub count: i64,
    /// Share of the total, rounded to two decimals
    pub percentage: f64,
}

/// Distribution of users with a known age over the four bands
#[derive(Debug, Clone, PartialEq)]
pub struct AgeReport {
    pub total: i64,
    pub bands: Vec<BandShare>,
}

impl AgeReport {
    /// Build the report from grouped counts.
    ///
    /// Bands missing from `counts` report zero. Unknown labels are ignored.
    pub fn from_counts(total: i64, counts: &[AgeBandCount]) -> Self {
        let bands = AgeBand::ALL
            .into_iter()
            .map(|band| {
                let count: i64 = counts
                    .iter()
                    .filter(|c| c.age_group == band.label())
                    .map(|c| c.count)
                    .sum();
                BandShare {
                    band,
                    count,
                    percentage: percentage(count, total),
                }
            })
            .collect();

        Self { total, bands }
    }

    /// Report lines, header and footer included.
    ///
    /// Every band prints its percentage with two decimals, so a band with no
    /// users renders as `0.00%`.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.bands.len() + 3);
        lines.push(REPORT_TITLE.to_string());
        lines.push(format!("{:<width$} | % Distribution", "Age Group", width = GROUP_COLUMN_WIDTH));
        for share in &self.bands {
            lines.push(format!(
                "{:<width$} | {:.2}%",
                share.band.label(),
                share.percentage,
                width = GROUP_COLUMN_WIDTH
            ));
        }
        lines.push(REPORT_FOOTER.to_string());
        lines
    }

    pub fn render(&self) -> String {
        self.lines().join("\n")
    }
}

fn percentage(count: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let raw = count as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

/// Queries storage and logs the age distribution table
pub struct ReportGenerator {
    store: Arc<dyn UserStore>,
}

impl ReportGenerator {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Produce the report, or `None` when no stored user has an age
    pub async fn generate(&self) -> Result<Option<AgeReport>> {
        let total = self.store.count_users_with_age().await?;

        if total == 0 {
            info!("No users with age data found.");
            return Ok(None);
        }

        let counts = self.store.age_band_counts().await?;
        for unknown in counts
            .iter()
            .filter(|c| AgeBand::from_label(&c.age_group).is_none())
        {
            warn!(age_group = %unknown.age_group, "Ignoring unknown age group");
        }

        let report = AgeReport::from_counts(total, &counts);
        for line in report.lines() {
            info!("{}", line);
        }

        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(label: &str, count: i64) -> AgeBandCount {
        AgeBandCount {
            age_group: label.to_string(),
            count,
        }
    }

    #[test]
    fn test_bands_are_in_fixed_order() {
        let counts = vec![count("> 60", 1), count("< 20", 1), count("20 to 40", 2)];
        let report = AgeReport::from_counts(4, &counts);

        let order: Vec<AgeBand> = report.bands.iter().map(|b| b.band).collect();
        assert_eq!(order, AgeBand::ALL.to_vec());
        assert_eq!(report.bands[0].percentage, 25.0);
        assert_eq!(report.bands[1].percentage, 50.0);
        assert_eq!(report.bands[2].percentage, 0.0);
        assert_eq!(report.bands[3].percentage, 25.0);
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let counts = vec![
            count("< 20", 1),
            count("20 to 40", 1),
            count("40 to 60", 1),
            count("> 60", 4),
        ];
        let report = AgeReport::from_counts(7, &counts);

        let sum: f64 = report.bands.iter().map(|b| b.percentage).sum();
        assert!((sum - 100.0).abs() <= 0.01 * report.bands.len() as f64, "sum was {sum}");
        assert_eq!(report.bands[0].percentage, 14.29);
        assert_eq!(report.bands[3].percentage, 57.14);
    }

    #[test]
    fn test_render_fixed_width_table() {
        let counts = vec![count("< 20", 1), count("20 to 40", 2), count("> 60", 1)];
        let report = AgeReport::from_counts(4, &counts);

        let expected = [
            "--- Age Distribution Report ---",
            "Age Group    | % Distribution",
            "< 20         | 25.00%",
            "20 to 40     | 50.00%",
            "40 to 60     | 0.00%",
            "> 60         | 25.00%",
            "---------------------------------",
        ]
        .join("\n");
        assert_eq!(report.render(), expected);
    }

    #[test]
    fn test_unknown_labels_are_ignored() {
        let counts = vec![count("< 20", 2), count("unknown", 5)];
        let report = AgeReport::from_counts(2, &counts);
        assert_eq!(report.bands[0].percentage, 100.0);
        assert_eq!(report.bands.iter().map(|b| b.count).sum::<i64>(), 2);
    }

    #[test]
    fn test_band_labels_round_trip() {
        for band in AgeBand::ALL {
            assert_eq!(AgeBand::from_label(band.label()), Some(band));
        }
        assert_eq!(AgeBand::from_label("60+"), None);
    }

    #[test]
    fn test_zero_total_gives_zero_percentages() {
        let report = AgeReport::from_counts(0, &[]);
        assert!(report.bands.iter().all(|b| b.percentage == 0.0));
    }
}
