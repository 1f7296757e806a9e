//! In-memory record of served classifications, for the history and
//! dashboard endpoints. Bounded, and lost on restart.
use paddy_core::internal::*;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

const DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const MONTH_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn from_confidence(confidence: f32) -> Severity {
        if confidence >= 0.9 {
            Severity::High
        } else if confidence >= 0.8 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

#[derive(Debug, Clone)]
pub struct Record {
    pub id: u64,
    pub at: OffsetDateTime,
    pub prediction: usize,
    pub label: String,
    pub confidence: f32,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryItem {
    pub id: u64,
    pub date: String,
    #[serde(rename = "disease")]
    pub label: String,
    pub prediction: usize,
    pub confidence: f32,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthStats {
    pub month: String,
    pub total: usize,
    pub healthy: usize,
    pub diseases: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub total_classifications: usize,
    pub classification_distribution: Vec<LabelCount>,
    pub classifications_by_month: Vec<MonthStats>,
}

#[derive(Debug)]
pub struct History {
    capacity: usize,
    next_id: u64,
    records: VecDeque<Record>,
}

impl History {
    pub fn new(capacity: usize) -> History {
        History { capacity, next_id: 1, records: VecDeque::with_capacity(capacity.min(1024)) }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Store a classification, evicting the oldest one when full.
    pub fn record(
        &mut self,
        at: OffsetDateTime,
        prediction: &Prediction,
        filename: Option<String>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        let label = prediction.label.clone().unwrap_or_else(|| prediction.class.to_string());
        self.records.push_back(Record {
            id,
            at,
            prediction: prediction.class,
            label,
            confidence: prediction.confidence,
            filename,
        });
        id
    }

    /// Newest first.
    pub fn items(&self) -> PaddyResult<Vec<HistoryItem>> {
        self.records
            .iter()
            .rev()
            .map(|r| {
                Ok(HistoryItem {
                    id: r.id,
                    date: r.at.format(DATE_FORMAT)?,
                    label: r.label.clone(),
                    prediction: r.prediction,
                    confidence: r.confidence,
                    severity: Severity::from_confidence(r.confidence),
                    image_filename: r.filename.clone(),
                })
            })
            .collect()
    }

    pub fn dashboard(&self, healthy_label: &str) -> PaddyResult<Dashboard> {
        let mut by_label: BTreeMap<&str, usize> = BTreeMap::new();
        let mut by_month: BTreeMap<String, MonthStats> = BTreeMap::new();
        for r in &self.records {
            *by_label.entry(r.label.as_str()).or_default() += 1;
            let month = r.at.format(MONTH_FORMAT)?;
            let stats = by_month.entry(month.clone()).or_insert_with(|| MonthStats {
                month,
                total: 0,
                healthy: 0,
                diseases: 0,
            });
            stats.total += 1;
            if r.label == healthy_label {
                stats.healthy += 1;
            } else {
                stats.diseases += 1;
            }
        }
        let mut classification_distribution: Vec<LabelCount> = by_label
            .into_iter()
            .map(|(label, count)| LabelCount { label: label.to_string(), count })
            .collect();
        classification_distribution.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(Dashboard {
            total_classifications: self.records.len(),
            classification_distribution,
            classifications_by_month: by_month.into_values().collect(),
        })
    }
}
