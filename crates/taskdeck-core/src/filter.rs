use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::error::ClientError;
use crate::task::{Priority, Task};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    All,
    Active,
    Completed,
}

impl Tab {
    fn keeps(self, task: &Task) -> bool {
        match self {
            Tab::All => true,
            Tab::Active => !task.completed,
            Tab::Completed => task.completed,
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tab::All => "all",
            Tab::Active => "active",
            Tab::Completed => "completed",
        })
    }
}

impl FromStr for Tab {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Tab::All),
            "active" => Ok(Tab::Active),
            "completed" | "done" => Ok(Tab::Completed),
            other => Err(ClientError::Validation(format!(
                "unknown tab: {other} (expected all, active or completed)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    Priority,
    Deadline,
    /// Newest first.
    #[default]
    Created,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortKey::Priority => "priority",
            SortKey::Deadline => "deadline",
            SortKey::Created => "created",
        })
    }
}

impl FromStr for SortKey {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "priority" => Ok(SortKey::Priority),
            "deadline" => Ok(SortKey::Deadline),
            "created" | "newest" | "created_at" => Ok(SortKey::Created),
            other => Err(ClientError::Validation(format!(
                "unknown sort key: {other} (expected priority, deadline or created)"
            ))),
        }
    }
}

/// Either no restriction or an exact value to match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Selection<T> {
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == value,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str("all"),
            Selection::Only(value) => write!(f, "{value}"),
        }
    }
}

impl<T> FromStr for Selection<T>
where
    T: FromStr,
{
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Selection::All);
        }
        s.parse::<T>().map(Selection::Only)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub tab: Tab,
    pub category: Selection<String>,
    pub priority: Selection<Priority>,
    pub search: String,
    pub sort: SortKey,
}

/// Derives the display sequence from the full store.
///
/// Stages run in a fixed order: search, tab, category, priority, then a
/// stable sort. Pure; recomputed in full whenever the store or the criteria
/// change.
#[tracing::instrument(skip(tasks, criteria), fields(tab = %criteria.tab, sort = %criteria.sort))]
pub fn derive_display(tasks: &[Task], criteria: &FilterCriteria) -> Vec<Task> {
    // Whitespace-only terms are ignored; otherwise the term is matched as typed.
    let needle = (!criteria.search.trim().is_empty()).then(|| criteria.search.to_lowercase());

    let mut visible: Vec<Task> = tasks
        .iter()
        .filter(|task| needle.as_deref().is_none_or(|n| task.matches_text(n)))
        .filter(|task| criteria.tab.keeps(task))
        .filter(|task| criteria.category.admits(&task.category))
        .filter(|task| criteria.priority.admits(&task.priority))
        .cloned()
        .collect();

    visible.sort_by(|a, b| compare(criteria.sort, a, b));

    trace!(
        total = tasks.len(),
        visible = visible.len(),
        "derived display sequence"
    );
    visible
}

fn compare(key: SortKey, a: &Task, b: &Task) -> Ordering {
    match key {
        SortKey::Priority => b.priority.weight().cmp(&a.priority.weight()),
        // Missing deadlines sort after every dated task.
        SortKey::Deadline => match (a.deadline, b.deadline) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::Created => b.created_at.cmp(&a.created_at),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{FilterCriteria, Selection, SortKey, Tab, derive_display};
    use crate::task::{Priority, Task, TaskId};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid timestamp")
    }

    fn task(id: u64, title: &str, priority: Priority, completed: bool, created: NaiveDateTime) -> Task {
        Task {
            id: TaskId(id),
            title: title.to_string(),
            description: String::new(),
            priority,
            category: "general".to_string(),
            deadline: None,
            completed,
            created_at: created,
        }
    }

    fn ids(tasks: &[Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.id.0).collect()
    }

    fn scenario_store() -> Vec<Task> {
        vec![
            task(1, "A", Priority::Low, false, at(1, 9)),
            task(2, "B", Priority::High, true, at(2, 9)),
        ]
    }

    #[test]
    fn active_tab_keeps_only_open_tasks() {
        let criteria = FilterCriteria {
            tab: Tab::Active,
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&derive_display(&scenario_store(), &criteria)), vec![1]);

        let criteria = FilterCriteria {
            tab: Tab::Completed,
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&derive_display(&scenario_store(), &criteria)), vec![2]);
    }

    #[test]
    fn priority_sort_puts_high_first() {
        let criteria = FilterCriteria {
            sort: SortKey::Priority,
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&derive_display(&scenario_store(), &criteria)), vec![2, 1]);
    }

    #[test]
    fn default_sort_is_newest_first() {
        let tasks = vec![
            task(1, "old", Priority::Medium, false, at(1, 9)),
            task(2, "newest", Priority::Medium, false, at(3, 9)),
            task(3, "middle", Priority::Medium, false, at(2, 9)),
        ];
        assert_eq!(
            ids(&derive_display(&tasks, &FilterCriteria::default())),
            vec![2, 3, 1]
        );
    }

    #[test]
    fn deadline_sort_is_ascending_with_missing_last() {
        let mut tasks = vec![
            task(1, "none-a", Priority::Medium, false, at(1, 9)),
            task(2, "late", Priority::Medium, false, at(1, 9)),
            task(3, "none-b", Priority::Medium, false, at(1, 9)),
            task(4, "early", Priority::Medium, false, at(1, 9)),
        ];
        tasks[1].deadline = NaiveDate::from_ymd_opt(2025, 6, 1);
        tasks[3].deadline = NaiveDate::from_ymd_opt(2025, 2, 1);

        let criteria = FilterCriteria {
            sort: SortKey::Deadline,
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&derive_display(&tasks, &criteria)), vec![4, 2, 1, 3]);
    }

    #[test]
    fn search_matches_description_only_and_ignores_case() {
        let mut tasks = scenario_store();
        tasks[0].description = "Buy MILK on the way".to_string();

        let criteria = FilterCriteria {
            search: "milk".to_string(),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&derive_display(&tasks, &criteria)), vec![1]);

        let criteria = FilterCriteria {
            search: "b".to_string(),
            ..FilterCriteria::default()
        };
        // "B" by title, task 1 by "Buy" in its description.
        assert_eq!(ids(&derive_display(&tasks, &criteria)), vec![2, 1]);
    }

    #[test]
    fn blank_search_excludes_nothing() {
        let criteria = FilterCriteria {
            search: "   ".to_string(),
            ..FilterCriteria::default()
        };
        assert_eq!(derive_display(&scenario_store(), &criteria).len(), 2);
    }

    #[test]
    fn search_keeps_surrounding_spaces() {
        let tasks = vec![
            task(1, "Mask", Priority::Medium, false, at(1, 9)),
            task(2, "ask the team", Priority::Medium, false, at(2, 9)),
        ];

        let criteria = FilterCriteria {
            search: "ask ".to_string(),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&derive_display(&tasks, &criteria)), vec![2]);

        let criteria = FilterCriteria {
            search: " ask".to_string(),
            ..FilterCriteria::default()
        };
        assert!(derive_display(&tasks, &criteria).is_empty());
    }

    #[test]
    fn priority_ties_keep_store_order() {
        let tasks = vec![
            task(5, "low", Priority::Low, false, at(1, 9)),
            task(3, "high-a", Priority::High, false, at(4, 9)),
            task(9, "medium", Priority::Medium, false, at(2, 9)),
            task(1, "high-b", Priority::High, false, at(1, 9)),
            task(7, "high-c", Priority::High, true, at(3, 9)),
        ];
        let criteria = FilterCriteria {
            sort: SortKey::Priority,
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&derive_display(&tasks, &criteria)), vec![3, 1, 7, 9, 5]);
    }

    #[test]
    fn equal_created_at_keeps_store_order() {
        let tasks = vec![
            task(4, "same-a", Priority::Low, false, at(2, 9)),
            task(2, "older", Priority::High, false, at(1, 9)),
            task(8, "same-b", Priority::High, false, at(2, 9)),
            task(6, "same-c", Priority::Medium, true, at(2, 9)),
        ];
        assert_eq!(
            ids(&derive_display(&tasks, &FilterCriteria::default())),
            vec![4, 8, 6, 2]
        );
    }

    #[test]
    fn category_and_priority_are_exact_matches() {
        let mut tasks = scenario_store();
        tasks[0].category = "work".to_string();
        tasks[1].category = "workshop".to_string();

        let criteria = FilterCriteria {
            category: Selection::Only("work".to_string()),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&derive_display(&tasks, &criteria)), vec![1]);

        let criteria = FilterCriteria {
            priority: Selection::Only(Priority::High),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&derive_display(&tasks, &criteria)), vec![2]);
    }

    #[test]
    fn output_is_a_subsequence_satisfying_every_predicate() {
        let mut tasks = Vec::new();
        let priorities = Priority::ALL;
        for id in 0..18u64 {
            let mut t = task(
                id,
                if id % 2 == 0 { "Report" } else { "errand" },
                priorities[(id % 3) as usize],
                id % 4 == 0,
                at(1 + (id as u32 % 9), (id as u32) % 24),
            );
            t.category = if id % 5 == 0 { "home" } else { "work" }.to_string();
            t.description = if id % 3 == 0 { "weekly report" } else { "" }.to_string();
            tasks.push(t);
        }

        let tabs = [Tab::All, Tab::Active, Tab::Completed];
        let categories = [
            Selection::All,
            Selection::Only("home".to_string()),
            Selection::Only("work".to_string()),
        ];
        let mut prios = vec![Selection::All];
        prios.extend(priorities.iter().copied().map(Selection::Only));
        let searches = ["", "report", "ERRAND", "nothing"];
        let sorts = [SortKey::Created, SortKey::Priority, SortKey::Deadline];

        for tab in tabs {
            for category in &categories {
                for priority in &prios {
                    for search in searches {
                        for sort in sorts {
                            let criteria = FilterCriteria {
                                tab,
                                category: category.clone(),
                                priority: priority.clone(),
                                search: search.to_string(),
                                sort,
                            };
                            let out = derive_display(&tasks, &criteria);
                            let needle = search.to_lowercase();

                            for shown in &out {
                                assert!(tasks.contains(shown));
                                assert!(needle.is_empty() || shown.matches_text(&needle));
                                assert!(match tab {
                                    Tab::All => true,
                                    Tab::Active => !shown.completed,
                                    Tab::Completed => shown.completed,
                                });
                                assert!(category.admits(&shown.category));
                                assert!(priority.admits(&shown.priority));
                            }

                            let expected = tasks
                                .iter()
                                .filter(|t| needle.is_empty() || t.matches_text(&needle))
                                .filter(|t| match tab {
                                    Tab::All => true,
                                    Tab::Active => !t.completed,
                                    Tab::Completed => t.completed,
                                })
                                .filter(|t| category.admits(&t.category))
                                .filter(|t| priority.admits(&t.priority))
                                .count();
                            assert_eq!(out.len(), expected);

                            assert_eq!(out, derive_display(&tasks, &criteria));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn selections_parse_all_keyword() {
        assert_eq!("all".parse::<Selection<Priority>>().ok(), Some(Selection::All));
        assert_eq!(
            "high".parse::<Selection<Priority>>().ok(),
            Some(Selection::Only(Priority::High))
        );
        assert_eq!(
            "ALL".parse::<Selection<String>>().ok(),
            Some(Selection::All)
        );
        assert_eq!("done".parse::<Tab>().ok(), Some(Tab::Completed));
        assert!("sideways".parse::<SortKey>().is_err());
    }
}
