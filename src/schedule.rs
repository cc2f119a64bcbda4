use hypertext::prelude::*;
use serde::{Deserialize, Deserializer};

/// Literal text the service embeds in a line item whose task is past its deadline.
pub const OVERDUE_MARKER: &str = "⚠ OVERDUE";

/// One day heading and its line items, in service order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleDay {
    pub label: String,
    pub items: Vec<String>,
}

/// The service's day-grouped schedule. Day order is the order the service sent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schedule {
    days: Vec<ScheduleDay>,
}

impl Schedule {
    pub fn days(&self) -> &[ScheduleDay] {
        &self.days
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl<'de> Deserialize<'de> for Schedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // serde_json's preserve_order keeps the map in wire order
        let raw = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        let days = raw
            .into_iter()
            .map(|(label, items)| {
                let items: Vec<String> =
                    serde_json::from_value(items).map_err(serde::de::Error::custom)?;
                Ok(ScheduleDay { label, items })
            })
            .collect::<Result<Vec<_>, D::Error>>()?;
        Ok(Schedule { days })
    }
}

pub fn is_overdue_item(item: &str) -> bool {
    item.contains(OVERDUE_MARKER)
}

/// Full replacement for the `#schedule` region.
pub fn render_schedule(schedule: &Schedule) -> String {
    maud! {
        @if schedule.is_empty() {
            p .empty-schedule { "Nothing scheduled." }
        }
        @for day in schedule.days() {
            div .schedule-day {
                h3 { (day.label) }
                @for item in &day.items {
                    @if is_overdue_item(item) {
                        p .overdue-text { "- " (item) }
                    } @else {
                        p { "- " (item) }
                    }
                }
            }
        }
    }
    .render()
    .into_inner()
}
