use log::{debug, info};

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::*;
use crate::table::ResponseTable;

/// Referral identifiers (`ref` and `unique` values) believed to belong to
/// the same recruitment chain.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SeedGroup {
    members: BTreeSet<String>,
}

impl SeedGroup {
    fn pair(referrer: &str, unique: &str) -> SeedGroup {
        let mut members = BTreeSet::new();
        members.insert(referrer.to_string());
        members.insert(unique.to_string());
        SeedGroup { members }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Partitions the rows of a response table into referral chains and answers
/// "which rows came from this seed" queries.
///
/// The grouping is computed once, when the grouper is created. The table is
/// borrowed for the lifetime of the grouper and cannot change under it.
pub struct SeedGrouper<'a> {
    table: &'a ResponseTable,
    main_seeds: &'a [String],
    ref_idx: usize,
    groups: Vec<SeedGroup>,
    // The group each row was placed in. None for rows with a malformed identifier.
    assignments: Vec<Option<usize>>,
}

impl<'a> SeedGrouper<'a> {
    pub fn new(table: &'a ResponseTable, settings: &'a SurveySettings) -> SurveyResult<SeedGrouper<'a>> {
        let columns = &settings.columns;
        let ref_idx = table.column_index(&columns.ref_column)?;
        let unique_idx = table.column_index(&columns.unique_column)?;
        let links: Vec<Option<(&str, &str)>> = table
            .rows()
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let (referrer, unique) = (row[ref_idx].as_str(), row[unique_idx].as_str());
                if unique.chars().count() == columns.unique_length {
                    Some((referrer, unique))
                } else {
                    debug!(
                        "SeedGrouper: row {}: skipping malformed identifier {:?}",
                        idx + 1,
                        unique
                    );
                    None
                }
            })
            .collect();

        let (groups, assignments) = match settings.grouping {
            GroupingPolicy::Incremental => group_incremental(&links),
            GroupingPolicy::Connected => group_connected(&links),
        };
        info!(
            "SeedGrouper: {} rows, {} groups ({:?} policy)",
            table.len(),
            groups.len(),
            settings.grouping
        );
        Ok(SeedGrouper {
            table,
            main_seeds: &settings.main_seeds,
            ref_idx,
            groups,
            assignments,
        })
    }

    pub fn groups(&self) -> &[SeedGroup] {
        &self.groups
    }

    /// The group a row (0-based, header excluded) was placed in.
    pub fn group_of_row(&self, row: usize) -> Option<usize> {
        self.assignments.get(row).copied().flatten()
    }

    /// The first group containing this identifier.
    pub fn group_of(&self, id: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.contains(id))
    }

    /// The rows whose referrer belongs to the group of `seed`, in table order.
    ///
    /// With [`ALL_OTHER_SEEDS`], the rows whose referrer belongs to any group
    /// that contains none of the main seeds. A seed found in no group gives
    /// an empty table.
    pub fn rows_for_seed(&self, seed: &str) -> ResponseTable {
        let referrers: HashSet<&str> = if seed == ALL_OTHER_SEEDS {
            self.groups
                .iter()
                .filter(|g| !self.main_seeds.iter().any(|s| g.contains(s)))
                .flat_map(|g| g.members())
                .collect()
        } else {
            self.groups
                .iter()
                .find(|g| g.contains(seed))
                .map(|g| g.members().collect())
                .unwrap_or_default()
        };
        let rows: Vec<Vec<String>> = self
            .table
            .rows()
            .iter()
            .filter(|row| referrers.contains(row[self.ref_idx].as_str()))
            .cloned()
            .collect();
        debug!("rows_for_seed: seed {:?}: {} rows", seed, rows.len());
        self.table.with_rows(rows)
    }
}

/// Groups the rows and returns the rows of one seed.
pub fn rows_for_seed(
    table: &ResponseTable,
    settings: &SurveySettings,
    seed: &str,
) -> SurveyResult<ResponseTable> {
    Ok(SeedGrouper::new(table, settings)?.rows_for_seed(seed))
}

// A row joins the first group that already holds its referrer, or starts a
// new one. Groups are never merged afterwards.
fn group_incremental(links: &[Option<(&str, &str)>]) -> (Vec<SeedGroup>, Vec<Option<usize>>) {
    let mut groups: Vec<SeedGroup> = Vec::new();
    let mut assignments: Vec<Option<usize>> = Vec::with_capacity(links.len());
    for link in links.iter() {
        let (referrer, unique) = match link {
            Some(x) => *x,
            None => {
                assignments.push(None);
                continue;
            }
        };
        let gidx = match groups.iter().position(|g| g.contains(referrer)) {
            Some(gidx) => {
                groups[gidx].members.insert(unique.to_string());
                gidx
            }
            None => {
                groups.push(SeedGroup::pair(referrer, unique));
                groups.len() - 1
            }
        };
        assignments.push(Some(gidx));
    }
    (groups, assignments)
}

// Disjoint sets over referral identifiers.
struct DisjointSet<'s> {
    ids: HashMap<&'s str, usize>,
    names: Vec<&'s str>,
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl<'s> DisjointSet<'s> {
    fn new() -> DisjointSet<'s> {
        DisjointSet {
            ids: HashMap::new(),
            names: Vec::new(),
            parent: Vec::new(),
            rank: Vec::new(),
        }
    }

    fn node(&mut self, name: &'s str) -> usize {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = self.parent.len();
        self.ids.insert(name, id);
        self.names.push(name);
        self.parent.push(id);
        self.rank.push(0);
        id
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

// Connected components of the referral graph, numbered by first appearance.
fn group_connected(links: &[Option<(&str, &str)>]) -> (Vec<SeedGroup>, Vec<Option<usize>>) {
    let mut sets = DisjointSet::new();
    let row_nodes: Vec<Option<usize>> = links
        .iter()
        .map(|link| {
            link.map(|(referrer, unique)| {
                let a = sets.node(referrer);
                let b = sets.node(unique);
                sets.union(a, b);
                a
            })
        })
        .collect();

    let mut root_to_group: HashMap<usize, usize> = HashMap::new();
    let mut assignments: Vec<Option<usize>> = Vec::with_capacity(links.len());
    for node in row_nodes.iter() {
        let gidx = node.map(|n| {
            let root = sets.find(n);
            let next = root_to_group.len();
            *root_to_group.entry(root).or_insert(next)
        });
        assignments.push(gidx);
    }

    let mut groups: Vec<SeedGroup> = vec![SeedGroup::default(); root_to_group.len()];
    for id in 0..sets.names.len() {
        let root = sets.find(id);
        if let Some(gidx) = root_to_group.get(&root) {
            groups[*gidx].members.insert(sets.names[id].to_string());
        }
    }
    (groups, assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    fn table(rows: &[(&str, &str)]) -> ResponseTable {
        ResponseTable::new(
            s(&["ref", "unique"]),
            rows.iter().map(|(r, u)| s(&[r, u])).collect(),
        )
        .unwrap()
    }

    fn settings(seeds: &[&str], grouping: GroupingPolicy) -> SurveySettings {
        SurveySettings {
            main_seeds: s(seeds),
            grouping,
            ..SurveySettings::default()
        }
    }

    fn refs(t: &ResponseTable) -> Vec<String> {
        t.rows().iter().map(|r| r[0].clone()).collect()
    }

    #[test]
    fn chain_with_seed_row_first() {
        let t = ResponseTable::new(
            s(&["city", "ref", "unique"]),
            vec![
                s(&["A1", "*", "sd01"]),
                s(&["A1", "sd01", "aaaa"]),
                s(&["A2", "sd01", "bbbb"]),
            ],
        )
        .unwrap();
        let cfg = settings(&["sd01", "*"], GroupingPolicy::Incremental);
        let g = SeedGrouper::new(&t, &cfg).unwrap();
        assert_eq!(g.groups().len(), 1);
        assert_eq!(g.rows_for_seed("sd01").len(), 3);
        // The only group holds a main seed.
        assert!(g.rows_for_seed("*").is_empty());
    }

    #[test]
    fn long_seed_identifier_is_not_grouped() {
        // The seed row has a 5-character identifier: it never joins a group,
        // and its referrer "*" is in no group either.
        let t = ResponseTable::new(
            s(&["city", "ref", "unique"]),
            vec![
                s(&["A1", "seed1", "aaaa"]),
                s(&["A2", "seed1", "bbbb"]),
                s(&["A1", "*", "seed1"]),
            ],
        )
        .unwrap();
        let cfg = settings(&["seed1", "*"], GroupingPolicy::Incremental);
        let g = SeedGrouper::new(&t, &cfg).unwrap();
        assert_eq!(g.groups().len(), 1);
        assert_eq!(g.group_of_row(2), None);
        let rows = g.rows_for_seed("seed1");
        assert_eq!(rows.header(), t.header());
        assert_eq!(rows.rows(), &t.rows()[..2]);
    }

    #[test]
    fn unknown_seed_gives_header_only() {
        let t = table(&[("sd01", "aaaa")]);
        let cfg = settings(&["sd01"], GroupingPolicy::Incremental);
        let rows = rows_for_seed(&t, &cfg, "zzzz").unwrap();
        assert!(rows.is_empty());
        assert_eq!(rows.header(), &s(&["ref", "unique"])[..]);
    }

    #[test]
    fn wildcard_keeps_table_order() {
        let t = table(&[
            ("xx01", "aaaa"),
            ("sd01", "bbbb"),
            ("yy01", "cccc"),
            ("aaaa", "dddd"),
            ("bbbb", "eeee"),
            ("cccc", "ffff"),
        ]);
        let cfg = settings(&["sd01", "*"], GroupingPolicy::Incremental);
        let g = SeedGrouper::new(&t, &cfg).unwrap();
        assert_eq!(refs(&g.rows_for_seed("sd01")), s(&["sd01", "bbbb"]));
        assert_eq!(
            refs(&g.rows_for_seed("*")),
            s(&["xx01", "yy01", "aaaa", "cccc"])
        );
    }

    #[test]
    fn incremental_does_not_merge_late_links() {
        let rows = [
            ("sd01", "aaaa"),
            ("bbbb", "cccc"),
            ("aaaa", "bbbb"),
            ("cccc", "dddd"),
        ];
        let t = table(&rows);

        let cfg = settings(&["sd01", "*"], GroupingPolicy::Incremental);
        let g = SeedGrouper::new(&t, &cfg).unwrap();
        assert_eq!(g.groups().len(), 2);
        assert_eq!(refs(&g.rows_for_seed("sd01")), s(&["sd01", "bbbb", "aaaa"]));
        assert_eq!(refs(&g.rows_for_seed("*")), s(&["bbbb", "cccc"]));

        let cfg = settings(&["sd01", "*"], GroupingPolicy::Connected);
        let g = SeedGrouper::new(&t, &cfg).unwrap();
        assert_eq!(g.groups().len(), 1);
        assert_eq!(g.rows_for_seed("sd01").len(), 4);
        assert!(g.rows_for_seed("*").is_empty());
    }

    #[test]
    fn missing_columns() {
        let t = ResponseTable::new(s(&["city"]), vec![s(&["A1"])]).unwrap();
        let cfg = SurveySettings::default();
        assert!(matches!(
            SeedGrouper::new(&t, &cfg),
            Err(SurveyError::MissingColumn { column }) if column == "ref"
        ));
    }

    const POOL: [&str; 7] = ["sd01", "aaaa", "bbbb", "cccc", "dddd", "eeee", "bad"];

    fn link_strategy() -> impl Strategy<Value = Vec<(usize, usize)>> {
        proptest::collection::vec((0..POOL.len(), 0..POOL.len()), 0..40)
    }

    fn pool_table(links: &[(usize, usize)]) -> ResponseTable {
        let rows: Vec<(&str, &str)> = links.iter().map(|(r, u)| (POOL[*r], POOL[*u])).collect();
        table(&rows)
    }

    proptest! {
        #[test]
        fn grouping_is_deterministic(links in link_strategy()) {
            let t = pool_table(&links);
            for policy in [GroupingPolicy::Incremental, GroupingPolicy::Connected] {
                let cfg = settings(&["sd01", "*"], policy);
                let g1 = SeedGrouper::new(&t, &cfg).unwrap();
                let g2 = SeedGrouper::new(&t, &cfg).unwrap();
                prop_assert_eq!(g1.groups(), g2.groups());
                prop_assert_eq!(g1.rows_for_seed("sd01"), g2.rows_for_seed("sd01"));
                prop_assert_eq!(g1.rows_for_seed("*"), g2.rows_for_seed("*"));
            }
        }

        #[test]
        fn every_valid_row_has_exactly_one_group(links in link_strategy()) {
            let t = pool_table(&links);
            for policy in [GroupingPolicy::Incremental, GroupingPolicy::Connected] {
                let cfg = settings(&["sd01"], policy);
                let g = SeedGrouper::new(&t, &cfg).unwrap();
                for (idx, row) in t.rows().iter().enumerate() {
                    let valid = row[1].chars().count() == 4;
                    match g.group_of_row(idx) {
                        Some(gidx) => {
                            prop_assert!(valid);
                            prop_assert!(g.groups()[gidx].contains(&row[1]));
                        }
                        None => prop_assert!(!valid),
                    }
                }
            }
        }

        #[test]
        fn connected_groups_are_disjoint(links in link_strategy()) {
            let t = pool_table(&links);
            let cfg = settings(&["sd01"], GroupingPolicy::Connected);
            let g = SeedGrouper::new(&t, &cfg).unwrap();
            let mut seen: HashSet<&str> = HashSet::new();
            for group in g.groups() {
                for m in group.members() {
                    prop_assert!(seen.insert(m));
                }
            }
        }
    }
}
