use crate::model::{EntityId, Rgba};
use crate::settings::SwimlaneSettings;
use crate::store::{EdgeKey, EntityStore};
use eframe::egui::{Pos2, pos2};

#[derive(Clone, Debug, PartialEq)]
pub struct Lane {
    pub participant_id: EntityId,
    pub name: String,
    pub color: Rgba,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StepKind {
    Edge { key: EdgeKey, count: usize },
    Decision { id: EntityId },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub kind: StepKind,
    pub label: String,
    pub lane: usize,
    pub target_lane: Option<usize>,
    pub column: usize,
    pub timestamp: u64,
    pub center: Pos2,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OptionRoute {
    Forward { cubic: [Pos2; 4] },
    Backward { polyline: Vec<Pos2> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptionPath {
    pub decision_id: EntityId,
    pub option_index: usize,
    pub label: String,
    pub color: Rgba,
    /// Index into `SwimlaneLayout::steps`; `None` targets the lane header.
    pub target_step: Option<usize>,
    pub route: OptionRoute,
}

impl OptionPath {
    pub fn is_backward(&self) -> bool {
        matches!(self.route, OptionRoute::Backward { .. })
    }

    pub fn polyline(&self, samples: usize) -> Vec<Pos2> {
        match &self.route {
            OptionRoute::Backward { polyline } => polyline.clone(),
            OptionRoute::Forward { cubic } => {
                let samples = samples.max(2);
                (0..=samples)
                    .map(|i| cubic_point(cubic, i as f32 / samples as f32))
                    .collect()
            }
        }
    }
}

fn cubic_point(c: &[Pos2; 4], t: f32) -> Pos2 {
    let u = 1.0 - t;
    let w = [u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t];
    let x: f32 = c.iter().zip(w).map(|(p, w)| p.x * w).sum();
    let y: f32 = c.iter().zip(w).map(|(p, w)| p.y * w).sum();
    pos2(x, y)
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SwimlaneLayout {
    pub lanes: Vec<Lane>,
    pub steps: Vec<Step>,
    pub option_paths: Vec<OptionPath>,
    pub columns: usize,
    pub width: f32,
    pub height: f32,
}

impl SwimlaneLayout {
    pub fn lane_of(&self, participant_id: &str) -> Option<usize> {
        self.lanes
            .iter()
            .position(|l| l.participant_id == participant_id)
    }

    pub fn header_center(&self, lane: usize, settings: &SwimlaneSettings) -> Option<Pos2> {
        self.lanes
            .get(lane)
            .map(|l| pos2(settings.header_width * 0.5, l.y))
    }
}

fn column_x(column: usize, s: &SwimlaneSettings) -> f32 {
    s.header_width + (column as f32 - 0.5) * s.column_width
}

pub fn swimlane_layout(store: &EntityStore, settings: &SwimlaneSettings) -> SwimlaneLayout {
    let lanes: Vec<Lane> = store
        .participants
        .iter()
        .enumerate()
        .map(|(i, p)| Lane {
            participant_id: p.id.clone(),
            name: p.name.clone(),
            color: p.color,
            y: (i as f32 + 0.5) * settings.lane_height,
        })
        .collect();
    let lane_of = |id: &str| lanes.iter().position(|l| l.participant_id == id);

    let mut steps: Vec<Step> = Vec::new();
    for group in store.grouped_connections() {
        let Some(lane) = lane_of(group.from) else {
            continue;
        };
        let label = match group.cards.as_slice() {
            [only] => only.label.clone(),
            [first, ..] => format!("{} (+{})", first.label, group.count() - 1),
            [] => String::new(),
        };
        steps.push(Step {
            kind: StepKind::Edge {
                key: group.key(),
                count: group.count(),
            },
            label,
            lane,
            target_lane: group.to.and_then(lane_of),
            column: 0,
            timestamp: group.earliest_timestamp(),
            center: Pos2::ZERO,
        });
    }
    for node in store.decision_nodes.iter() {
        let Some(lane) = lane_of(&node.from) else {
            continue;
        };
        steps.push(Step {
            kind: StepKind::Decision {
                id: node.id.clone(),
            },
            label: node.question.clone(),
            lane,
            target_lane: None,
            column: 0,
            timestamp: node.timestamp,
            center: Pos2::ZERO,
        });
    }
    steps.sort_by_key(|s| s.timestamp);
    for (i, step) in steps.iter_mut().enumerate() {
        step.column = i + 1;
        step.center = pos2(column_x(step.column, settings), lanes[step.lane].y);
    }

    let mut layout = SwimlaneLayout {
        columns: steps.len() + 1,
        width: settings.header_width + steps.len() as f32 * settings.column_width,
        height: lanes.len() as f32 * settings.lane_height,
        lanes,
        steps,
        option_paths: Vec::new(),
    };
    layout.option_paths = option_paths(store, &layout, settings);
    log::debug!(
        "swimlane layout: {} lanes, {} steps, {} option paths",
        layout.lanes.len(),
        layout.steps.len(),
        layout.option_paths.len()
    );
    layout
}

fn option_paths(
    store: &EntityStore,
    layout: &SwimlaneLayout,
    settings: &SwimlaneSettings,
) -> Vec<OptionPath> {
    let half_w = settings.step_half_width;
    let half_h = settings.lane_height * 0.25;
    let mut paths = Vec::new();
    for decision in &layout.steps {
        let StepKind::Decision { id } = &decision.kind else {
            continue;
        };
        let Some(node) = store.decision_nodes.get(id) else {
            continue;
        };
        for (option_index, option) in node.options.iter().enumerate() {
            let Some(target_lane) = option.target.as_deref().and_then(|t| layout.lane_of(t)) else {
                continue;
            };
            let in_lane = |s: &&Step| s.lane == target_lane || s.target_lane == Some(target_lane);
            let forward = layout
                .steps
                .iter()
                .position(|s| s.column > decision.column && in_lane(&s));
            let route_and_target = match forward {
                Some(i) => {
                    let target = layout.steps[i].center;
                    let start = pos2(decision.center.x + half_w, decision.center.y);
                    let end = pos2(target.x - half_w, target.y);
                    let pull = ((end.x - start.x) * 0.5).max(settings.column_width * 0.25);
                    (
                        OptionRoute::Forward {
                            cubic: [
                                start,
                                pos2(start.x + pull, start.y),
                                pos2(end.x - pull, end.y),
                                end,
                            ],
                        },
                        Some(i),
                    )
                }
                None => {
                    let earlier = layout
                        .steps
                        .iter()
                        .rposition(|s| s.column < decision.column && in_lane(&s));
                    let target = match earlier {
                        Some(i) => pos2(layout.steps[i].center.x, layout.lanes[target_lane].y),
                        None => match layout.header_center(target_lane, settings) {
                            Some(p) => p,
                            None => continue,
                        },
                    };
                    let start = pos2(decision.center.x, decision.center.y - half_h);
                    let end = pos2(target.x, target.y - half_h);
                    let route_y = start.y.min(end.y) - settings.loop_clearance;
                    (
                        OptionRoute::Backward {
                            polyline: vec![
                                start,
                                pos2(start.x, route_y),
                                pos2(end.x, route_y),
                                end,
                            ],
                        },
                        earlier,
                    )
                }
            };
            let (route, target_step) = route_and_target;
            paths.push(OptionPath {
                decision_id: id.clone(),
                option_index,
                label: option.label.clone(),
                color: option.color,
                target_step,
                route,
            });
        }
    }
    paths
}
