/// EasyDash View Implementation
///
/// Views are read-only row subsets of a shared table. Every UI interaction
/// builds a fresh view from the immutable base table; nothing is patched in
/// place.

use crate::error::Result;
use crate::fields::orders;
use crate::table::Table;
use std::collections::HashSet;
use std::sync::Arc;

/// Anything that exposes a table together with an ordered set of its rows.
///
/// Aggregations are written against this trait so they run the same way on
/// a whole table and on a filtered view.
pub trait RowSource {
    fn table(&self) -> &Table;

    /// Parent row indices, in table order.
    fn row_indices(&self) -> Box<dyn Iterator<Item = usize> + '_>;

    fn row_count(&self) -> usize;
}

impl RowSource for Table {
    fn table(&self) -> &Table {
        self
    }

    fn row_indices(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        Box::new(0..self.len())
    }

    fn row_count(&self) -> usize {
        self.len()
    }
}

/// A FilterView filters rows from the parent table based on a predicate.
/// Maintains a mapping from view indices to parent indices.
pub struct FilterView {
    name: String,
    parent: Arc<Table>,
    view_to_parent: Vec<usize>,
}

impl FilterView {
    pub fn new<F>(name: impl Into<String>, parent: Arc<Table>, predicate: F) -> Self
    where
        F: Fn(&Table, usize) -> bool,
    {
        // The parent is immutable, so the index is computed once.
        let view_to_parent = (0..parent.len()).filter(|&i| predicate(&parent, i)).collect();
        FilterView {
            name: name.into(),
            parent,
            view_to_parent,
        }
    }

    /// A view that keeps every row.
    pub fn all(name: impl Into<String>, parent: Arc<Table>) -> Self {
        Self::new(name, parent, |_, _| true)
    }

    pub fn len(&self) -> usize {
        self.view_to_parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view_to_parent.is_empty()
    }

}

impl RowSource for FilterView {
    fn table(&self) -> &Table {
        &self.parent
    }

    fn row_indices(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        Box::new(self.view_to_parent.iter().copied())
    }

    fn row_count(&self) -> usize {
        self.view_to_parent.len()
    }
}

impl std::fmt::Debug for FilterView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FilterView {{ name: '{}', parent: '{}', rows: {} }}",
            self.name,
            self.parent.name(),
            self.len()
        )
    }
}

/// A borrowed, ad-hoc subset of another row source, used inside
/// aggregations (e.g. "rows with a discount").
pub struct RowSubset<'a> {
    table: &'a Table,
    rows: Vec<usize>,
}

impl<'a> RowSubset<'a> {
    pub fn filter<S, F>(source: &'a S, predicate: F) -> Self
    where
        S: RowSource + ?Sized,
        F: Fn(&Table, usize) -> bool,
    {
        let table = source.table();
        let rows = source.row_indices().filter(|&i| predicate(table, i)).collect();
        RowSubset { table, rows }
    }
}

impl RowSource for RowSubset<'_> {
    fn table(&self) -> &Table {
        self.table
    }

    fn row_indices(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        Box::new(self.rows.iter().copied())
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Segment multi-select filter. An empty selection keeps every row; otherwise
/// a row is kept iff its segment is one of the selected values.
pub fn segment_filter(table: Arc<Table>, selected: &[String]) -> Result<FilterView> {
    if selected.is_empty() {
        return Ok(FilterView::all("all_segments", table));
    }
    let segment_idx = table.require(&[orders::SEGMENT])?[0];

    let wanted: HashSet<String> = selected.iter().cloned().collect();
    Ok(FilterView::new("segments", table, move |t, row| {
        t.str_at(row, segment_idx)
            .map_or(false, |segment| wanted.contains(segment))
    }))
}
