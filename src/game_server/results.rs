//! Results - Finish events in crossing order
//!
//! The collector only accepts as many finishers as there are runners.
//! Presentation helpers sort by time for the results screen.

use serde::{Deserialize, Serialize};
use crate::game_server::runner::RunnerConfig;

/// A runner whose finish was detected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finisher {
    pub runner: RunnerConfig,
    /// Race time at detection, in milliseconds
    pub time_ms: f64,
    /// 1-based detection order
    pub position: u32,
}

impl Finisher {
    /// Seconds with three decimals, as shown on the finish table
    pub fn formatted_time(&self) -> String {
        format_time(self.time_ms)
    }
}

pub fn format_time(time_ms: f64) -> String {
    format!("{:.3}", time_ms / 1000.0)
}

/// Ordered finisher list for one race
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultCollector {
    expected: usize,
    finishers: Vec<Finisher>,
}

impl ResultCollector {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            finishers: Vec::with_capacity(expected),
        }
    }

    /// Record a finish. Returns the assigned position, or `None` once every
    /// expected runner is already in.
    pub fn record(&mut self, runner: &RunnerConfig, time_ms: f64) -> Option<u32> {
        if self.is_complete() {
            return None;
        }
        let position = (self.finishers.len() + 1) as u32;
        self.finishers.push(Finisher {
            runner: runner.clone(),
            time_ms,
            position,
        });
        Some(position)
    }

    pub fn len(&self) -> usize {
        self.finishers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finishers.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.finishers.len() >= self.expected
    }

    pub fn finishers(&self) -> &[Finisher] {
        &self.finishers
    }
}

/// Everything handed to the completion callback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceReport {
    pub name: Option<String>,
    pub sponsor: Option<String>,
    pub seed: String,
    /// Detection order
    pub finishers: Vec<Finisher>,
}

impl RaceReport {
    /// Finishers ordered by time; same-time entries keep detection order.
    pub fn standings(&self) -> Vec<&Finisher> {
        let mut standings: Vec<&Finisher> = self.finishers.iter().collect();
        standings.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));
        standings
    }

    /// Top three, fewer when the field is small
    pub fn podium(&self) -> Vec<&Finisher> {
        self.standings().into_iter().take(3).collect()
    }

    pub fn winner(&self) -> Option<&Finisher> {
        self.standings().first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(name: &str, number: u32) -> RunnerConfig {
        RunnerConfig::new(name, "#000000", number)
    }

    #[test]
    fn test_record_in_order() {
        let mut results = ResultCollector::new(2);
        assert_eq!(results.record(&cfg("A", 1), 900.0), Some(1));
        assert_eq!(results.record(&cfg("B", 2), 950.0), Some(2));
        assert!(results.is_complete());
        assert_eq!(results.finishers()[1].runner.name, "B");
    }

    #[test]
    fn test_record_refuses_extra() {
        let mut results = ResultCollector::new(1);
        results.record(&cfg("A", 1), 900.0);
        assert_eq!(results.record(&cfg("B", 2), 950.0), None);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_standings_stable_on_ties() {
        let report = RaceReport {
            name: None,
            sponsor: None,
            seed: "abc".into(),
            finishers: vec![
                Finisher { runner: cfg("A", 1), time_ms: 2000.0, position: 1 },
                Finisher { runner: cfg("B", 2), time_ms: 2000.0, position: 2 },
                Finisher { runner: cfg("C", 3), time_ms: 1500.0, position: 3 },
                Finisher { runner: cfg("D", 4), time_ms: 2500.0, position: 4 },
            ],
        };
        let names: Vec<&str> = report.standings().iter().map(|f| f.runner.name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B", "D"]);
        assert_eq!(report.podium().len(), 3);
        assert_eq!(report.winner().unwrap().runner.name, "C");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(12345.0), "12.345");
        assert_eq!(format_time(500.0), "0.500");
    }
}
