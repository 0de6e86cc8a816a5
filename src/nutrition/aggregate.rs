use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use time::Date;

use super::{date_key, MealCategory, NutritionError, Result};

/// Anything that can be summed into a day: a category, a weight and
/// (possibly unknown) calories.
pub trait Portion {
    fn category(&self) -> MealCategory;
    fn weight_grams(&self) -> f64;
    fn calories(&self) -> Option<f64>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotals {
    pub weight: f64,
    pub calories: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_weight: f64,
    pub total_calories: f64,
}

impl Totals {
    fn add(&mut self, weight: f64, calories: Option<f64>) {
        self.total_weight += weight;
        self.total_calories += calories.unwrap_or(0.0);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAggregate {
    /// Always holds every category, zeroed when nothing was eaten in it.
    pub categories: BTreeMap<MealCategory, CategoryTotals>,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord<T> {
    #[serde(serialize_with = "serialize_date_key")]
    pub date: Date,
    pub entries: Vec<T>,
    #[serde(flatten)]
    pub aggregate: DayAggregate,
}

fn serialize_date_key<S: Serializer>(date: &Date, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&date_key(*date))
}

pub fn aggregate_day<T: Portion>(entries: &[T]) -> DayAggregate {
    let mut categories: BTreeMap<MealCategory, CategoryTotals> = MealCategory::ALL
        .iter()
        .map(|c| (*c, CategoryTotals::default()))
        .collect();
    let mut totals = Totals::default();

    for entry in entries {
        let slot = categories.entry(entry.category()).or_default();
        slot.weight += entry.weight_grams();
        slot.calories += entry.calories().unwrap_or(0.0);
        totals.add(entry.weight_grams(), entry.calories());
    }

    DayAggregate { categories, totals }
}

/// One record per calendar day in `[start, end]`, ascending. Days the
/// lookup has nothing for still get a zeroed record.
pub fn aggregate_range<T, F>(start: Date, end: Date, mut lookup: F) -> Result<Vec<DayRecord<T>>>
where
    T: Portion,
    F: FnMut(Date) -> Vec<T>,
{
    if end < start {
        return Err(NutritionError::InvalidInput(
            "end must not be before start".into(),
        ));
    }

    let mut days = Vec::new();
    let mut cursor = start;
    loop {
        let entries = lookup(cursor);
        let aggregate = aggregate_day(&entries);
        days.push(DayRecord {
            date: cursor,
            entries,
            aggregate,
        });
        if cursor >= end {
            break;
        }
        cursor = match cursor.next_day() {
            Some(next) => next,
            None => break,
        };
    }
    Ok(days)
}

pub fn range_totals<T>(days: &[DayRecord<T>]) -> Totals {
    let mut totals = Totals::default();
    for day in days {
        totals.add(day.aggregate.totals.total_weight, Some(day.aggregate.totals.total_calories));
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[derive(Debug, Clone, PartialEq)]
    struct Row(MealCategory, f64, Option<f64>);

    impl Portion for Row {
        fn category(&self) -> MealCategory {
            self.0
        }
        fn weight_grams(&self) -> f64 {
            self.1
        }
        fn calories(&self) -> Option<f64> {
            self.2
        }
    }

    fn sample() -> Vec<Row> {
        vec![
            Row(MealCategory::Lunch, 150.0, Some(247.5)),
            Row(MealCategory::Dinner, 300.0, None),
            Row(MealCategory::Lunch, 50.0, Some(20.25)),
            Row(MealCategory::Snacks, 30.0, Some(160.0)),
        ]
    }

    #[test]
    fn day_groups_by_category_and_treats_missing_calories_as_zero() {
        let agg = aggregate_day(&sample());
        assert_eq!(
            agg.categories[&MealCategory::Lunch],
            CategoryTotals { weight: 200.0, calories: 267.75 }
        );
        assert_eq!(
            agg.categories[&MealCategory::Dinner],
            CategoryTotals { weight: 300.0, calories: 0.0 }
        );
        assert_eq!(agg.totals.total_weight, 530.0);
        assert_eq!(agg.totals.total_calories, 427.75);
    }

    #[test]
    fn category_sums_match_direct_sums_in_any_order() {
        let mut rows = sample();
        for _ in 0..rows.len() {
            rows.rotate_left(1);
            let agg = aggregate_day(&rows);
            let weight: f64 = agg.categories.values().map(|c| c.weight).sum();
            let calories: f64 = agg.categories.values().map(|c| c.calories).sum();
            assert_eq!(weight, agg.totals.total_weight);
            assert_eq!(calories, agg.totals.total_calories);
        }
    }

    #[test]
    fn empty_day_lists_every_category_at_zero() {
        let agg = aggregate_day::<Row>(&[]);
        assert_eq!(agg.categories.len(), MealCategory::ALL.len());
        assert_eq!(agg.totals, Totals::default());
    }

    #[test]
    fn range_keeps_gap_days() {
        let days = aggregate_range(date!(2024 - 03 - 10), date!(2024 - 03 - 12), |d| {
            if d == date!(2024 - 03 - 11) {
                sample()
            } else {
                Vec::new()
            }
        })
        .unwrap();

        let dates: Vec<Date> = days.iter().map(|d| d.date).collect();
        assert_eq!(
            dates,
            vec![date!(2024 - 03 - 10), date!(2024 - 03 - 11), date!(2024 - 03 - 12)]
        );
        assert!(days[0].entries.is_empty());
        assert_eq!(days[0].aggregate.totals, Totals::default());
        assert_eq!(days[1].entries.len(), 4);
        assert_eq!(days[1].aggregate.totals.total_weight, 530.0);
        assert!(days[2].entries.is_empty());
        assert_eq!(days[2].aggregate.totals, Totals::default());
    }

    #[test]
    fn single_day_range_and_reversed_range() {
        let one = aggregate_range(date!(2024 - 03 - 10), date!(2024 - 03 - 10), |_| {
            Vec::<Row>::new()
        })
        .unwrap();
        assert_eq!(one.len(), 1);

        let err = aggregate_range(date!(2024 - 03 - 11), date!(2024 - 03 - 10), |_| {
            Vec::<Row>::new()
        })
        .unwrap_err();
        assert!(matches!(err, NutritionError::InvalidInput(_)));
    }

    #[test]
    fn week_totals_sum_every_day() {
        let days = aggregate_range(date!(2024 - 03 - 10), date!(2024 - 03 - 16), |d| {
            vec![Row(MealCategory::Snacks, 10.0, Some(f64::from(d.day())))]
        })
        .unwrap();
        assert_eq!(days.len(), 7);
        let totals = range_totals(&days);
        assert_eq!(totals.total_weight, 70.0);
        assert_eq!(totals.total_calories, (10..=16).sum::<u32>() as f64);
    }

    #[test]
    fn day_record_serializes_with_date_key() {
        let days = aggregate_range(date!(2024 - 03 - 10), date!(2024 - 03 - 10), |_| {
            Vec::<Row>::new()
        })
        .unwrap();
        let record = DayRecord {
            date: days[0].date,
            entries: Vec::<u8>::new(),
            aggregate: days[0].aggregate.clone(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["date"], "2024-03-10");
        assert_eq!(json["totalWeight"], 0.0);
        assert_eq!(json["categories"]["lunch"]["calories"], 0.0);
    }
}
