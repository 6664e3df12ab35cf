//! What an agent can see of its neighbours.
//!
//! The tick loop collects a [`NeighborView`] for every agent in the
//! buckets around the actor, so an agent never borrows another agent while
//! it acts. Visibility is a range check plus a bearing check: the angle
//! between the actor's heading and the direction to the target must not
//! exceed half the field of view. A target at zero distance is always
//! visible.

use ecosim_types::{AgentId, Sex, Species, Vec2};

/// A read-only copy of the parts of a neighbour an actor may sense.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborView {
    /// The neighbour's handle.
    pub id: AgentId,
    /// The neighbour's species.
    pub species: Species,
    /// The neighbour's sex.
    pub sex: Sex,
    /// The neighbour's position at the time of the scan.
    pub position: Vec2,
    /// Whether the neighbour is still alive.
    pub alive: bool,
}

/// Sensing parameters of an observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sight {
    /// Observer position.
    pub position: Vec2,
    /// Observer unit heading.
    pub heading: Vec2,
    /// Full field-of-view angle in radians.
    pub field_of_view: f64,
    /// Sensing range.
    pub view_distance: f64,
}

impl Sight {
    /// Whether `target` lies inside the view cone.
    pub fn can_see(&self, target: Vec2) -> bool {
        let offset = target - self.position;
        let distance = offset.length();
        if !distance.is_finite() || distance > self.view_distance {
            return false;
        }
        match self.heading.angle_between(offset) {
            Some(bearing) => bearing <= self.field_of_view / 2.0,
            None => true,
        }
    }

    /// The closest visible neighbour accepted by `filter`. Ties go to the
    /// neighbour scanned first.
    pub fn nearest<'a, F>(&self, neighbors: &'a [NeighborView], filter: F) -> Option<&'a NeighborView>
    where
        F: Fn(&NeighborView) -> bool,
    {
        let mut best: Option<(&NeighborView, f64)> = None;
        for neighbor in neighbors {
            if !neighbor.alive || !filter(neighbor) || !self.can_see(neighbor.position) {
                continue;
            }
            let distance = self.position.distance(neighbor.position);
            if best.is_none_or(|(_, nearest)| distance < nearest) {
                best = Some((neighbor, distance));
            }
        }
        best.map(|(neighbor, _)| neighbor)
    }
}
