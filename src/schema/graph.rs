//! Foreign-key dependency ordering.
//!
//! Tables are ordered so that every table comes after the tables it
//! references. Tables that cannot be placed (cycles, or references to tables
//! missing from the schema) are appended in their original order.

use super::Table;

/// Result of dependency ordering, as indices into the input slice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyOrder {
    /// All tables: ordered tables first, then the unordered remainder
    pub order: Vec<usize>,
    /// Tables appended without ordering (cycles or unresolvable references)
    pub cyclic_tables: Vec<usize>,
}

impl DependencyOrder {
    /// Check if every table could be placed after its dependencies
    pub fn is_acyclic(&self) -> bool {
        self.cyclic_tables.is_empty()
    }
}

/// Compute the dependency order of `tables`.
///
/// Repeatedly scans the unplaced tables in input order and places the first
/// one whose foreign-key targets are already placed or are the table itself.
/// A scan that places nothing appends the remaining tables as-is.
pub fn dependency_order(tables: &[Table]) -> DependencyOrder {
    let mut placed = vec![false; tables.len()];
    let mut order = Vec::with_capacity(tables.len());
    let mut remaining: Vec<usize> = (0..tables.len()).collect();

    let is_placed = |placed: &[bool], name: &str| {
        tables
            .iter()
            .enumerate()
            .any(|(i, t)| placed[i] && t.name.eq_ignore_ascii_case(name))
    };

    while !remaining.is_empty() {
        let next = remaining.iter().position(|&idx| {
            let table = &tables[idx];
            table.foreign_keys.iter().all(|fk| {
                fk.referenced_table.eq_ignore_ascii_case(&table.name)
                    || is_placed(&placed, &fk.referenced_table)
            })
        });

        match next {
            Some(pos) => {
                let idx = remaining.remove(pos);
                placed[idx] = true;
                order.push(idx);
            }
            None => break,
        }
    }

    order.extend_from_slice(&remaining);
    DependencyOrder {
        order,
        cyclic_tables: remaining,
    }
}

/// Return the tables in dependency order (referenced tables first)
pub fn sort_tables_by_dependencies(tables: &[Table]) -> Vec<Table> {
    dependency_order(tables)
        .order
        .into_iter()
        .map(|i| tables[i].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ForeignKey;

    fn table(name: &str, refs: &[&str]) -> Table {
        let mut t = Table::new(name);
        for r in refs {
            t.foreign_keys.push(ForeignKey {
                name: None,
                column: format!("{}_id", r),
                referenced_table: r.to_string(),
                referenced_column: "id".to_string(),
            });
        }
        t
    }

    #[test]
    fn test_parents_first() {
        let tables = vec![
            table("orders", &["users"]),
            table("users", &[]),
            table("products", &[]),
        ];
        let result = dependency_order(&tables);
        assert_eq!(result.order, vec![1, 0, 2]);
        assert!(result.is_acyclic());
    }

    #[test]
    fn test_cycle_appended() {
        let tables = vec![
            table("a", &["b"]),
            table("b", &["a"]),
            table("c", &[]),
        ];
        let result = dependency_order(&tables);
        assert_eq!(result.order, vec![2, 0, 1]);
        assert_eq!(result.cyclic_tables, vec![0, 1]);
    }
}
