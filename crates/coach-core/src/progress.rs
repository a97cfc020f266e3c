//! Territory research progress: the 3×3 area catalog, per-area insight rows,
//! and the derived progress numbers the phase gates and the UI consume.

use crate::error::{CoachError, Result};
use crate::types::{AreaStatus, Territory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// AreaCatalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaDef {
    pub territory: Territory,
    pub id: String,
    pub title: String,
    /// Number of guiding questions; an area is mapped only when every index
    /// in `0..question_count` has a non-empty response.
    pub question_count: u32,
}

/// The fixed set of research areas: three per territory. Shipped defaults
/// come from the product configuration; custom catalogs are constructible
/// for tests and white-label deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaCatalog {
    areas: Vec<AreaDef>,
}

impl AreaCatalog {
    pub fn new(areas: Vec<AreaDef>) -> Self {
        Self { areas }
    }

    pub fn areas(&self) -> &[AreaDef] {
        &self.areas
    }

    pub fn areas_for(&self, territory: Territory) -> impl Iterator<Item = &AreaDef> {
        self.areas.iter().filter(move |a| a.territory == territory)
    }

    pub fn area(&self, territory: Territory, area_id: &str) -> Option<&AreaDef> {
        self.areas
            .iter()
            .find(|a| a.territory == territory && a.id == area_id)
    }

    /// Total number of areas per territory (3 in the default catalog).
    pub fn territory_total(&self, territory: Territory) -> u32 {
        self.areas_for(territory).count() as u32
    }

    pub fn total_areas(&self) -> u32 {
        self.areas.len() as u32
    }
}

impl Default for AreaCatalog {
    fn default() -> Self {
        fn def(territory: Territory, id: &str, title: &str, question_count: u32) -> AreaDef {
            AreaDef {
                territory,
                id: id.to_string(),
                title: title.to_string(),
                question_count,
            }
        }
        Self::new(vec![
            def(Territory::Company, "purpose-vision", "Purpose & Vision", 3),
            def(Territory::Company, "capabilities", "Capabilities & Assets", 4),
            def(Territory::Company, "business-model", "Business Model", 3),
            def(Territory::Customer, "segments", "Segments", 3),
            def(Territory::Customer, "needs-jobs", "Needs & Jobs", 4),
            def(Territory::Customer, "journey", "Journey & Experience", 3),
            def(Territory::Competitor, "landscape", "Competitive Landscape", 3),
            def(Territory::Competitor, "positioning", "Positioning", 3),
            def(Territory::Competitor, "market-trends", "Market Trends", 4),
        ])
    }
}

// ---------------------------------------------------------------------------
// TerritoryInsight
// ---------------------------------------------------------------------------

/// One research area's recorded answers. A missing row reads as
/// `Unexplored`; a row is `Mapped` only when every question index has a
/// non-empty response, and once mapped it is never auto-demoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryInsight {
    pub territory: Territory,
    pub area_id: String,
    #[serde(default)]
    pub responses: BTreeMap<u32, String>,
    pub status: AreaStatus,
}

impl TerritoryInsight {
    pub fn new(territory: Territory, area_id: impl Into<String>) -> Self {
        Self {
            territory,
            area_id: area_id.into(),
            responses: BTreeMap::new(),
            status: AreaStatus::Unexplored,
        }
    }

    fn answered(&self, index: u32) -> bool {
        self.responses
            .get(&index)
            .map(|r| !r.trim().is_empty())
            .unwrap_or(false)
    }

    /// Recompute status from the responses. Mapped is sticky.
    fn refresh_status(&mut self, question_count: u32) {
        if self.status == AreaStatus::Mapped {
            return;
        }
        let all_answered =
            question_count > 0 && (0..question_count).all(|i| self.answered(i));
        self.status = if all_answered {
            AreaStatus::Mapped
        } else if self.responses.values().any(|r| !r.trim().is_empty()) {
            AreaStatus::InProgress
        } else {
            AreaStatus::Unexplored
        };
    }
}

// ---------------------------------------------------------------------------
// TerritoryProgress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerritoryProgress {
    pub mapped: u32,
    pub total: u32,
    /// Display-only: mapped plus half credit for in-progress areas. Never
    /// used for phase gating.
    pub effective: f32,
}

// ---------------------------------------------------------------------------
// ProgressBoard
// ---------------------------------------------------------------------------

/// All territory insights for one conversation, keyed by (territory, area).
/// The backing store is external; this is the session's working copy,
/// refreshed on mount and mutated by explicit saves and marker captures.
#[derive(Debug, Clone)]
pub struct ProgressBoard {
    catalog: AreaCatalog,
    insights: BTreeMap<(Territory, String), TerritoryInsight>,
}

impl ProgressBoard {
    pub fn new(catalog: AreaCatalog) -> Self {
        Self {
            catalog,
            insights: BTreeMap::new(),
        }
    }

    pub fn catalog(&self) -> &AreaCatalog {
        &self.catalog
    }

    pub fn insight(&self, territory: Territory, area_id: &str) -> Option<&TerritoryInsight> {
        self.insights.get(&(territory, area_id.to_string()))
    }

    pub fn status(&self, territory: Territory, area_id: &str) -> AreaStatus {
        self.insight(territory, area_id)
            .map(|i| i.status)
            .unwrap_or(AreaStatus::Unexplored)
    }

    /// Replace the working copy with rows loaded from the store.
    pub fn load_rows(&mut self, rows: Vec<TerritoryInsight>) {
        self.insights.clear();
        for row in rows {
            self.insights
                .insert((row.territory, row.area_id.clone()), row);
        }
    }

    /// Record one answer (explicit save or marker capture) and refresh the
    /// area status.
    pub fn record_response(
        &mut self,
        territory: Territory,
        area_id: &str,
        question_index: u32,
        answer: impl Into<String>,
    ) -> Result<AreaStatus> {
        let def = self
            .catalog
            .area(territory, area_id)
            .ok_or_else(|| CoachError::UnknownArea {
                territory: territory.to_string(),
                area: area_id.to_string(),
            })?;
        if question_index >= def.question_count {
            return Err(CoachError::QuestionIndexOutOfRange {
                area: area_id.to_string(),
                index: question_index,
                count: def.question_count,
            });
        }
        let question_count = def.question_count;
        let insight = self
            .insights
            .entry((territory, area_id.to_string()))
            .or_insert_with(|| TerritoryInsight::new(territory, area_id));
        insight.responses.insert(question_index, answer.into());
        insight.refresh_status(question_count);
        Ok(insight.status)
    }

    /// Mark an area mapped on an explicit completion signal. Unknown areas
    /// are rejected; already-mapped areas stay mapped.
    pub fn complete_area(&mut self, territory: Territory, area_id: &str) -> Result<AreaStatus> {
        if self.catalog.area(territory, area_id).is_none() {
            return Err(CoachError::UnknownArea {
                territory: territory.to_string(),
                area: area_id.to_string(),
            });
        }
        let insight = self
            .insights
            .entry((territory, area_id.to_string()))
            .or_insert_with(|| TerritoryInsight::new(territory, area_id));
        insight.status = AreaStatus::Mapped;
        Ok(insight.status)
    }

    pub fn territory_progress(&self, territory: Territory) -> TerritoryProgress {
        let total = self.catalog.territory_total(territory);
        let mut mapped = 0u32;
        let mut in_progress = 0u32;
        for def in self.catalog.areas_for(territory) {
            match self.status(territory, &def.id) {
                AreaStatus::Mapped => mapped += 1,
                AreaStatus::InProgress => in_progress += 1,
                AreaStatus::Unexplored => {}
            }
        }
        TerritoryProgress {
            mapped,
            total,
            effective: mapped as f32 + in_progress as f32 * 0.5,
        }
    }

    /// Count of mapped areas across all territories — the phase-gate input.
    pub fn mapped_area_count(&self) -> u32 {
        Territory::all()
            .iter()
            .map(|t| self.territory_progress(*t).mapped)
            .sum()
    }

    pub fn territory_complete(&self, territory: Territory) -> bool {
        let p = self.territory_progress(territory);
        p.total > 0 && p.mapped == p.total
    }
}

impl Default for ProgressBoard {
    fn default() -> Self {
        Self::new(AreaCatalog::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_shape() {
        let catalog = AreaCatalog::default();
        assert_eq!(catalog.total_areas(), 9);
        for t in Territory::all() {
            assert_eq!(catalog.territory_total(*t), 3);
        }
        for area in catalog.areas() {
            assert!((3..=4).contains(&area.question_count));
        }
    }

    #[test]
    fn missing_area_reads_unexplored() {
        let board = ProgressBoard::default();
        assert_eq!(
            board.status(Territory::Company, "capabilities"),
            AreaStatus::Unexplored
        );
        let p = board.territory_progress(Territory::Company);
        assert_eq!((p.mapped, p.total), (0, 3));
    }

    #[test]
    fn mapped_iff_every_question_answered() {
        let mut board = ProgressBoard::default();
        // purpose-vision has 3 questions
        for i in 0..2 {
            let status = board
                .record_response(Territory::Company, "purpose-vision", i, format!("a{i}"))
                .unwrap();
            assert_eq!(status, AreaStatus::InProgress);
        }
        let status = board
            .record_response(Territory::Company, "purpose-vision", 2, "a2")
            .unwrap();
        assert_eq!(status, AreaStatus::Mapped);
    }

    #[test]
    fn blank_response_does_not_count_as_answered() {
        let mut board = ProgressBoard::default();
        board
            .record_response(Territory::Company, "purpose-vision", 0, "real")
            .unwrap();
        board
            .record_response(Territory::Company, "purpose-vision", 1, "   ")
            .unwrap();
        let status = board
            .record_response(Territory::Company, "purpose-vision", 2, "real")
            .unwrap();
        assert_eq!(status, AreaStatus::InProgress);
    }

    #[test]
    fn mapped_is_never_demoted() {
        let mut board = ProgressBoard::default();
        board
            .complete_area(Territory::Customer, "segments")
            .unwrap();
        // Overwriting an answer with blank must not drop the mapped status.
        let status = board
            .record_response(Territory::Customer, "segments", 0, "")
            .unwrap();
        assert_eq!(status, AreaStatus::Mapped);
    }

    #[test]
    fn unknown_area_rejected() {
        let mut board = ProgressBoard::default();
        assert!(matches!(
            board.record_response(Territory::Company, "nonsense", 0, "x"),
            Err(CoachError::UnknownArea { .. })
        ));
        assert!(matches!(
            board.complete_area(Territory::Company, "nonsense"),
            Err(CoachError::UnknownArea { .. })
        ));
    }

    #[test]
    fn question_index_out_of_range_rejected() {
        let mut board = ProgressBoard::default();
        assert!(matches!(
            board.record_response(Territory::Company, "purpose-vision", 3, "x"),
            Err(CoachError::QuestionIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn effective_progress_counts_partial_credit() {
        let mut board = ProgressBoard::default();
        board
            .complete_area(Territory::Company, "purpose-vision")
            .unwrap();
        board
            .record_response(Territory::Company, "capabilities", 0, "start")
            .unwrap();
        let p = board.territory_progress(Territory::Company);
        assert_eq!(p.mapped, 1);
        assert!((p.effective - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn mapped_area_count_spans_territories() {
        let mut board = ProgressBoard::default();
        board
            .complete_area(Territory::Company, "purpose-vision")
            .unwrap();
        board
            .complete_area(Territory::Customer, "segments")
            .unwrap();
        board
            .complete_area(Territory::Competitor, "landscape")
            .unwrap();
        assert_eq!(board.mapped_area_count(), 3);
        assert!(!board.territory_complete(Territory::Company));
    }

    #[test]
    fn territory_complete_when_all_three_mapped() {
        let mut board = ProgressBoard::default();
        for area in ["purpose-vision", "capabilities", "business-model"] {
            board.complete_area(Territory::Company, area).unwrap();
        }
        assert!(board.territory_complete(Territory::Company));
    }

    #[test]
    fn load_rows_replaces_working_copy() {
        let mut board = ProgressBoard::default();
        board
            .complete_area(Territory::Company, "purpose-vision")
            .unwrap();

        let mut row = TerritoryInsight::new(Territory::Customer, "segments");
        row.status = AreaStatus::Mapped;
        board.load_rows(vec![row]);

        assert_eq!(
            board.status(Territory::Company, "purpose-vision"),
            AreaStatus::Unexplored
        );
        assert_eq!(
            board.status(Territory::Customer, "segments"),
            AreaStatus::Mapped
        );
    }
}
