use crate::model::{EntityId, Point};
use crate::store::EntityStore;
use std::f32::consts::TAU;

pub const RADIAL_CENTER: Point = Point::new(50.0, 50.0);

#[derive(Clone, Debug, PartialEq)]
pub struct RadialSlot {
    pub participant_id: EntityId,
    /// `2 * outgoing - incoming`.
    pub score: i64,
    pub degree: usize,
    pub angle: f32,
    pub position: Point,
}

pub fn radial_layout(store: &EntityStore, radius: f32) -> Vec<RadialSlot> {
    let mut ranked: Vec<(EntityId, i64, usize)> = store
        .participants
        .iter()
        .filter(|p| p.is_placed())
        .map(|p| {
            let outgoing = store.connections.iter().filter(|c| c.from == p.id).count();
            let incoming = store
                .connections
                .iter()
                .filter(|c| c.to.as_deref() == Some(p.id.as_str()))
                .count();
            (
                p.id.clone(),
                2 * outgoing as i64 - incoming as i64,
                outgoing + incoming,
            )
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)));

    let n = ranked.len();
    ranked
        .into_iter()
        .enumerate()
        .map(|(i, (participant_id, score, degree))| {
            let angle = TAU * i as f32 / n as f32 - TAU / 4.0;
            RadialSlot {
                participant_id,
                score,
                degree,
                angle,
                position: Point::new(
                    RADIAL_CENTER.x + radius * angle.cos(),
                    RADIAL_CENTER.y + radius * angle.sin(),
                ),
            }
        })
        .collect()
}
