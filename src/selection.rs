//! Selection rules for marking file copies for deletion.
//!
//! # Overview
//!
//! Selection is per cluster and guarded by one safety rule: a cluster
//! may never have every copy selected, because deleting a full cluster
//! would destroy the last remaining copy of that content. Every
//! operation that flips a file to selected re-checks the rule before
//! mutating.
//!
//! Two thresholds shape the behavior:
//!
//! * Individual selection requires at least two currently-unselected
//!   copies, so one copy is still unselected afterwards.
//! * The sweep ([`Cluster::select_all`]) leaves the first two unselected
//!   copies untouched and selects the rest.
//!
//! Deselecting is always legal.
//!
//! # Example
//!
//! ```
//! use dupweb::hal;
//! use dupweb::model::Cluster;
//! use serde_json::json;
//!
//! let envelope = json!({
//!     "_embedded": {"files": [
//!         {"abspath": "/a"}, {"abspath": "/b"}, {"abspath": "/c"}
//!     ]}
//! });
//! let mut cluster = Cluster::adopt(hal::parse(&envelope).unwrap());
//!
//! let kept = cluster.files()[0].id();
//! assert!(cluster.select_others(kept));
//!
//! assert_eq!(cluster.selected_count(), 2);
//! assert!(!cluster.is_file_selected(kept));
//! ```

use crate::model::{Cluster, FileId};

impl Cluster {
    // ==================== Mutation ====================

    /// Mark a file selected, if the safety rule allows it.
    ///
    /// Returns whether the file's state changed. Refused selections and
    /// unknown ids return `false`.
    pub fn select(&mut self, id: FileId) -> bool {
        if !self.can_select(id) {
            log::debug!("Refused selection of file {}", id);
            return false;
        }
        let Some(file) = self.files_mut().iter_mut().find(|file| file.id() == id) else {
            return false;
        };
        if file.is_selected() {
            return false;
        }
        file.set_selected(true);
        log::debug!("Selected file {} ({})", id, file.display_path());
        debug_assert!(self.unselected_count() > 0);
        true
    }

    /// Unmark a file. Always legal; returns whether the state changed.
    pub fn deselect(&mut self, id: FileId) -> bool {
        let Some(file) = self.files_mut().iter_mut().find(|file| file.id() == id) else {
            return false;
        };
        if !file.is_selected() {
            return false;
        }
        file.set_selected(false);
        log::debug!("Deselected file {} ({})", id, file.display_path());
        true
    }

    /// Flip a file's selection, honoring the selection rule on the way up.
    ///
    /// Returns whether the state changed.
    pub fn toggle_select(&mut self, id: FileId) -> bool {
        if self.is_file_selected(id) {
            self.deselect(id)
        } else {
            self.select(id)
        }
    }

    /// Select every copy except `keep`, which is deselected.
    ///
    /// Returns `false` without mutating when `keep` is not in this
    /// cluster, since selecting everything else would then select the
    /// whole cluster.
    pub fn select_others(&mut self, keep: FileId) -> bool {
        if self.file(keep).is_none() {
            log::debug!("Refused select-others: file {} not in cluster", keep);
            return false;
        }
        for file in self.files_mut() {
            let selected = file.id() != keep;
            file.set_selected(selected);
        }
        log::debug!("Selected all but file {}", keep);
        debug_assert!(self.unselected_count() > 0);
        true
    }

    /// Sweep-select the cluster, leaving the first two unselected copies
    /// unselected.
    ///
    /// The sweep only runs when it would still leave at least one copy
    /// unselected (`selected + 1 < total`); otherwise it is a no-op.
    /// Within the run, copies are visited in order and an unselected
    /// copy is flipped only when at least two unselected copies precede
    /// it.
    ///
    /// Returns the number of files newly selected.
    pub fn select_all(&mut self) -> usize {
        let total = self.len();
        let already = self.selected_count();
        if already + 1 >= total {
            log::debug!(
                "Refused sweep select: {} of {} already selected",
                already,
                total
            );
            return 0;
        }

        let mut unselected_seen = 0usize;
        let mut newly = 0usize;
        for file in self.files_mut() {
            if file.is_selected() {
                continue;
            }
            let index = unselected_seen;
            unselected_seen += 1;
            if index > 1 {
                file.set_selected(true);
                newly += 1;
            }
        }

        log::debug!(
            "Sweep selected {} files ({} of {} now selected)",
            newly,
            already + newly,
            total
        );
        debug_assert!(self.unselected_count() > 0);
        newly
    }

    /// Deselect every copy in the cluster.
    pub fn clear_selection(&mut self) {
        for file in self.files_mut() {
            file.set_selected(false);
        }
        log::debug!("Cleared selection");
    }

    // ==================== Queries ====================

    /// Whether selecting `id` is currently permitted.
    ///
    /// Already-selected files may always be "selected" again (a no-op),
    /// since that cannot break the safety rule. An unselected file may
    /// be selected only while at least two copies are unselected, so
    /// one remains afterwards. Unknown ids are never selectable.
    #[must_use]
    pub fn can_select(&self, id: FileId) -> bool {
        match self.file(id) {
            None => false,
            Some(file) if file.is_selected() => true,
            Some(_) => self.unselected_count() >= 2,
        }
    }

    /// Whether the given file is currently selected.
    #[must_use]
    pub fn is_file_selected(&self, id: FileId) -> bool {
        self.file(id).is_some_and(|file| file.is_selected())
    }

    /// Number of selected copies.
    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.files().iter().filter(|file| file.is_selected()).count()
    }

    /// Number of unselected copies.
    #[must_use]
    pub fn unselected_count(&self) -> usize {
        self.len() - self.selected_count()
    }

    /// Whether any copy is selected.
    #[must_use]
    pub fn has_selections(&self) -> bool {
        self.files().iter().any(|file| file.is_selected())
    }

    /// Ids of the selected copies, in cluster order.
    #[must_use]
    pub fn selected_file_ids(&self) -> Vec<FileId> {
        self.files()
            .iter()
            .filter(|file| file.is_selected())
            .map(|file| file.id())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::hal;
    use crate::model::{Cluster, FileId};
    use serde_json::json;

    fn make_cluster(count: usize) -> Cluster {
        let files: Vec<_> = (0..count)
            .map(|n| json!({"abspath": format!("/file{n}"), "size": 100}))
            .collect();
        let envelope = json!({"hash": "h", "size": 100, "_embedded": {"files": files}});
        Cluster::adopt(hal::parse(&envelope).expect("valid cluster envelope"))
    }

    fn ids(cluster: &Cluster) -> Vec<FileId> {
        cluster.files().iter().map(|file| file.id()).collect()
    }

    // ==================== Individual selection ====================

    #[test]
    fn test_select_and_deselect_roundtrip() {
        let mut cluster = make_cluster(3);
        let target = ids(&cluster)[0];

        assert!(cluster.select(target));
        assert!(cluster.is_file_selected(target));
        assert_eq!(cluster.selected_count(), 1);

        assert!(cluster.deselect(target));
        assert!(!cluster.is_file_selected(target));
        assert!(!cluster.has_selections());
    }

    #[test]
    fn test_select_already_selected_is_noop() {
        let mut cluster = make_cluster(3);
        let target = ids(&cluster)[0];

        assert!(cluster.select(target));
        assert!(!cluster.select(target));
        assert_eq!(cluster.selected_count(), 1);
    }

    #[test]
    fn test_deselect_unselected_is_noop() {
        let mut cluster = make_cluster(2);
        let target = ids(&cluster)[1];

        assert!(!cluster.deselect(target));
    }

    #[test]
    fn test_unknown_id_is_refused_everywhere() {
        let mut cluster = make_cluster(3);
        let bogus = FileId::MAX;

        assert!(!cluster.can_select(bogus));
        assert!(!cluster.select(bogus));
        assert!(!cluster.deselect(bogus));
        assert!(!cluster.toggle_select(bogus));
        assert!(!cluster.is_file_selected(bogus));
        assert!(!cluster.has_selections());
    }

    #[test]
    fn test_toggle_flips_both_ways() {
        let mut cluster = make_cluster(3);
        let target = ids(&cluster)[1];

        assert!(cluster.toggle_select(target));
        assert!(cluster.is_file_selected(target));
        assert!(cluster.toggle_select(target));
        assert!(!cluster.is_file_selected(target));
    }

    // ==================== Selection gating ====================

    #[test]
    fn test_two_file_cluster_allows_exactly_one_selection() {
        let mut cluster = make_cluster(2);
        let &[a, b] = &ids(&cluster)[..] else { unreachable!() };

        // Both unselected: either copy may be selected.
        assert!(cluster.can_select(a));
        assert!(cluster.can_select(b));

        assert!(cluster.select(a));

        // One unselected copy left: it must stay.
        assert!(!cluster.can_select(b));
        assert!(!cluster.select(b));
        assert_eq!(cluster.selected_count(), 1);
        assert_eq!(cluster.unselected_count(), 1);
    }

    #[test]
    fn test_three_file_cluster_stops_at_two_selected() {
        let mut cluster = make_cluster(3);
        let &[a, b, c] = &ids(&cluster)[..] else { unreachable!() };

        assert!(cluster.select(a));
        assert!(cluster.select(b));
        assert!(!cluster.select(c));

        assert_eq!(cluster.selected_count(), 2);
        assert!(!cluster.is_file_selected(c));
    }

    #[test]
    fn test_selected_file_may_be_reselected() {
        let mut cluster = make_cluster(2);
        let &[a, b] = &ids(&cluster)[..] else { unreachable!() };

        cluster.select(a);
        // Last unselected copy is off-limits but the selected one is not.
        assert!(cluster.can_select(a));
        assert!(!cluster.can_select(b));
    }

    #[test]
    fn test_toggle_refuses_selecting_last_unselected() {
        let mut cluster = make_cluster(2);
        let &[a, b] = &ids(&cluster)[..] else { unreachable!() };

        assert!(cluster.toggle_select(a));
        assert!(!cluster.toggle_select(b));
        assert!(!cluster.is_file_selected(b));
    }

    // ==================== Sweep selection ====================

    #[test]
    fn test_select_all_skips_first_two_unselected() {
        let mut cluster = make_cluster(4);
        let file_ids = ids(&cluster);

        let newly = cluster.select_all();

        assert_eq!(newly, 2);
        assert!(!cluster.is_file_selected(file_ids[0]));
        assert!(!cluster.is_file_selected(file_ids[1]));
        assert!(cluster.is_file_selected(file_ids[2]));
        assert!(cluster.is_file_selected(file_ids[3]));
    }

    #[test]
    fn test_select_all_on_three_files_selects_only_third() {
        let mut cluster = make_cluster(3);
        let file_ids = ids(&cluster);

        assert_eq!(cluster.select_all(), 1);
        assert_eq!(cluster.selected_file_ids(), vec![file_ids[2]]);
    }

    #[test]
    fn test_select_all_on_pair_selects_nothing() {
        let mut cluster = make_cluster(2);

        assert_eq!(cluster.select_all(), 0);
        assert!(!cluster.has_selections());
    }

    #[test]
    fn test_select_all_counts_skips_from_unselected_subsequence() {
        let mut cluster = make_cluster(5);
        let file_ids = ids(&cluster);

        // Pre-select the first two copies; the unselected subsequence
        // is then files 2..5 and the sweep skips its first two entries.
        cluster.select(file_ids[0]);
        cluster.select(file_ids[1]);

        assert_eq!(cluster.select_all(), 1);
        assert!(!cluster.is_file_selected(file_ids[2]));
        assert!(!cluster.is_file_selected(file_ids[3]));
        assert!(cluster.is_file_selected(file_ids[4]));
    }

    #[test]
    fn test_select_all_refused_when_one_unselected_remains() {
        let mut cluster = make_cluster(3);
        let file_ids = ids(&cluster);

        cluster.select(file_ids[0]);
        cluster.select(file_ids[1]);

        assert_eq!(cluster.select_all(), 0);
        assert_eq!(cluster.selected_count(), 2);
    }

    #[test]
    fn test_select_all_on_empty_cluster_is_noop() {
        let mut cluster = make_cluster(0);

        assert_eq!(cluster.select_all(), 0);
    }

    #[test]
    fn test_select_all_never_selects_everything() {
        for size in 2..8 {
            let mut cluster = make_cluster(size);
            cluster.select_all();
            cluster.select_all();
            assert!(
                cluster.unselected_count() > 0,
                "cluster of {} files fully selected by sweep",
                size
            );
        }
    }

    // ==================== Select others ====================

    #[test]
    fn test_select_others_keeps_only_the_target() {
        let mut cluster = make_cluster(3);
        let kept = ids(&cluster)[1];

        assert!(cluster.select_others(kept));

        assert_eq!(cluster.selected_count(), 2);
        assert!(!cluster.is_file_selected(kept));
    }

    #[test]
    fn test_select_others_overrides_previous_selection() {
        let mut cluster = make_cluster(3);
        let file_ids = ids(&cluster);

        cluster.select(file_ids[2]);
        cluster.select_others(file_ids[2]);

        assert!(!cluster.is_file_selected(file_ids[2]));
        assert!(cluster.is_file_selected(file_ids[0]));
        assert!(cluster.is_file_selected(file_ids[1]));
    }

    #[test]
    fn test_select_others_with_unknown_id_is_refused() {
        let mut cluster = make_cluster(3);

        assert!(!cluster.select_others(FileId::MAX));
        assert!(!cluster.has_selections());
    }

    #[test]
    fn test_select_others_on_single_file_selects_nothing() {
        let mut cluster = make_cluster(1);
        let only = ids(&cluster)[0];

        assert!(cluster.select_others(only));
        assert!(!cluster.has_selections());
    }

    // ==================== Clearing ====================

    #[test]
    fn test_clear_selection_resets_every_file() {
        let mut cluster = make_cluster(4);
        cluster.select_all();
        assert!(cluster.has_selections());

        cluster.clear_selection();

        assert!(!cluster.has_selections());
        assert_eq!(cluster.unselected_count(), 4);
    }

    // ==================== Observers ====================

    #[test]
    fn test_selected_file_ids_preserve_cluster_order() {
        let mut cluster = make_cluster(4);
        let file_ids = ids(&cluster);

        cluster.select(file_ids[3]);
        cluster.select(file_ids[0]);

        assert_eq!(
            cluster.selected_file_ids(),
            vec![file_ids[0], file_ids[3]]
        );
    }
}
