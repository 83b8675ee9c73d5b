//! Force-directed layout simulation
//!
//! Iterative relaxation over the visible node set. Each tick sums four
//! forces into the node velocities, integrates positions, and cools the
//! simulation:
//!
//! - **Link**: springs pull linked nodes toward `link_distance`
//! - **Charge**: every pair repels, inversely to squared distance
//! - **Centering**: a weak pull toward the viewport centre
//! - **Collision**: label-sized discs may not overlap
//!
//! Forces except collision are scaled by `alpha`, which decays toward
//! `alpha_target` every tick. The simulation settles when `alpha` drops
//! below `alpha_min` or the mean kinetic energy falls under the threshold.

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::vector::Vec2;
use crate::domain::graph::{Link, Node};
use crate::error::{Error, Result};

/// Ticks that must run after a reheat before energy alone can settle
const MIN_TICKS_BEFORE_SETTLE: u32 = 10;

/// Radius of the first phyllotaxis ring
const INITIAL_RADIUS: f64 = 10.0;

fn golden_angle() -> f64 {
    PI * (3.0 - 5f64.sqrt())
}

/// Tunable force strengths and cooling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Pairwise charge; negative values repel
    pub charge: f64,
    /// Rest length of link springs
    pub link_distance: f64,
    pub link_strength: f64,
    /// Pull toward the viewport centre
    pub center_strength: f64,
    pub collision_strength: f64,
    /// Extra space reserved around each label
    pub collision_padding: f64,
    /// Approximate label glyph width used for radius sizing
    pub char_width: f64,
    pub min_radius: f64,
    pub max_radius: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
    /// Fraction of velocity lost per tick
    pub velocity_decay: f64,
    /// Alpha the simulation is held at while a node is dragged
    pub drag_alpha_target: f64,
    /// Alpha restored when the visible set changes
    pub reheat_alpha: f64,
    /// Mean kinetic energy per node below which the layout is settled
    pub energy_threshold: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            charge: -300.0,
            link_distance: 120.0,
            link_strength: 0.5,
            center_strength: 0.05,
            collision_strength: 0.7,
            collision_padding: 10.0,
            char_width: 6.0,
            min_radius: 20.0,
            max_radius: 80.0,
            alpha_min: 0.001,
            // Reaches alpha_min from 1.0 in about 300 ticks
            alpha_decay: 1.0 - 0.001f64.powf(1.0 / 300.0),
            velocity_decay: 0.4,
            drag_alpha_target: 0.3,
            reheat_alpha: 0.3,
            energy_threshold: 0.01,
            width: 1200.0,
            height: 800.0,
        }
    }
}

impl LayoutConfig {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Collision radius large enough to fit the label
    pub fn radius_for(&self, label: &str) -> f64 {
        let half_width = label.chars().count() as f64 * self.char_width / 2.0;
        (half_width + self.collision_padding)
            .clamp(self.min_radius, self.max_radius.max(self.min_radius))
    }

    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f64| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(Error::ConfigError(format!("layout.{name} must be between 0 and 1, got {v}")))
            }
        };
        unit("alpha_decay", self.alpha_decay)?;
        unit("velocity_decay", self.velocity_decay)?;
        unit("drag_alpha_target", self.drag_alpha_target)?;
        unit("reheat_alpha", self.reheat_alpha)?;
        unit("alpha_min", self.alpha_min)?;

        if self.link_distance <= 0.0 {
            return Err(Error::ConfigError("layout.link_distance must be positive".into()));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(Error::ConfigError("layout viewport must have a positive size".into()));
        }
        if self.min_radius < 0.0 || self.energy_threshold < 0.0 {
            return Err(Error::ConfigError(
                "layout.min_radius and layout.energy_threshold must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Layout state machine
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LayoutPhase {
    /// Settled, or nothing to lay out
    #[default]
    Idle,
    /// Ticking toward a settled state
    Settling,
    /// A node is pinned under the pointer and the simulation is kept hot
    Dragging(String),
}

/// Position of one node, as handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

#[derive(Debug, Clone)]
struct Body {
    id: String,
    radius: f64,
    position: Vec2,
    velocity: Vec2,
    pin: Option<Vec2>,
}

impl Body {
    fn new(id: String, radius: f64) -> Self {
        Self {
            id,
            radius,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            pin: None,
        }
    }
}

/// Force-directed layout over the visible graph
#[derive(Debug, Clone)]
pub struct LayoutSimulation {
    config: LayoutConfig,
    bodies: Vec<Body>,
    index: HashMap<String, usize>,
    edges: Vec<(usize, usize)>,
    alpha: f64,
    phase: LayoutPhase,
    ticks: u64,
    ticks_since_heat: u32,
    placements: u64,
}

impl Default for LayoutSimulation {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl LayoutSimulation {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            bodies: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            alpha: 0.0,
            phase: LayoutPhase::Idle,
            ticks: 0,
            ticks_since_heat: 0,
            placements: 0,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Replace the tuning parameters and reheat
    pub fn set_config(&mut self, config: LayoutConfig) {
        for body in &mut self.bodies {
            body.radius = body
                .radius
                .clamp(config.min_radius, config.max_radius.max(config.min_radius));
        }
        self.config = config;
        self.reheat(false);
    }

    pub fn phase(&self) -> &LayoutPhase {
        &self.phase
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn is_settled(&self) -> bool {
        self.phase == LayoutPhase::Idle
    }

    // ========== Graph updates ==========

    /// Feed a new visible set
    ///
    /// Nodes that stay visible keep their position and velocity. New nodes
    /// are seeded next to an already placed neighbour, or on a phyllotaxis
    /// spiral around the centre. Returns whether the set actually changed;
    /// only a change reheats the simulation.
    pub fn set_graph(&mut self, nodes: &[Node], links: &[Link]) -> bool {
        let previous_pairs: HashSet<(String, String)> = self
            .edges
            .iter()
            .map(|&(s, t)| (self.bodies[s].id.clone(), self.bodies[t].id.clone()))
            .collect();

        let mut previous: HashMap<String, Body> =
            self.bodies.drain(..).map(|b| (b.id.clone(), b)).collect();

        let mut bodies = Vec::with_capacity(nodes.len());
        let mut fresh = Vec::new();
        for node in nodes {
            if bodies.iter().any(|b: &Body| b.id == node.id) {
                continue;
            }
            let radius = self.config.radius_for(&node.label);
            match previous.remove(&node.id) {
                Some(mut body) => {
                    body.radius = radius;
                    bodies.push(body);
                }
                None => {
                    fresh.push(bodies.len());
                    bodies.push(Body::new(node.id.clone(), radius));
                }
            }
        }
        let removed = previous.len();

        let index: HashMap<String, usize> = bodies
            .iter()
            .enumerate()
            .map(|(i, b)| (b.id.clone(), i))
            .collect();

        let mut seen = HashSet::new();
        let edges: Vec<(usize, usize)> = links
            .iter()
            .filter_map(|l| Some((*index.get(&l.source)?, *index.get(&l.target)?)))
            .filter(|&(s, t)| s != t && seen.insert((s, t)))
            .collect();
        let pairs: HashSet<(String, String)> = edges
            .iter()
            .map(|&(s, t)| (bodies[s].id.clone(), bodies[t].id.clone()))
            .collect();

        let all_fresh = !bodies.is_empty() && fresh.len() == bodies.len();
        self.seed_positions(&mut bodies, &edges, &fresh);

        self.bodies = bodies;
        self.index = index;
        self.edges = edges;

        if let LayoutPhase::Dragging(id) = &self.phase
            && !self.index.contains_key(id)
        {
            debug!(node_id = %id, "Dragged node left the visible set");
            self.phase = LayoutPhase::Settling;
        }

        let changed = !fresh.is_empty() || removed > 0 || pairs != previous_pairs;
        if changed {
            info!(
                nodes = self.bodies.len(),
                links = self.edges.len(),
                added = fresh.len(),
                removed,
                "Layout graph updated"
            );
            self.reheat(all_fresh);
        }
        changed
    }

    fn seed_positions(&mut self, bodies: &mut [Body], edges: &[(usize, usize)], fresh: &[usize]) {
        let center = self.config.center();
        let mut placed: Vec<bool> = vec![true; bodies.len()];
        for &i in fresh {
            placed[i] = false;
        }

        for &i in fresh {
            let anchor = edges.iter().find_map(|&(s, t)| match (s == i, t == i) {
                (true, false) if placed[t] => Some(t),
                (false, true) if placed[s] => Some(s),
                _ => None,
            });

            let n = self.placements as f64;
            let position = match anchor {
                Some(a) => {
                    bodies[a].position
                        + Vec2::from_angle(n * golden_angle()) * (self.config.link_distance * 0.5)
                }
                None => {
                    center
                        + Vec2::from_angle(n * golden_angle()) * (INITIAL_RADIUS * (0.5 + n).sqrt())
                }
            };
            self.placements += 1;

            bodies[i].position = position;
            bodies[i].velocity = Vec2::ZERO;
            placed[i] = true;
        }
    }

    fn reheat(&mut self, full: bool) {
        if self.bodies.is_empty() {
            self.phase = LayoutPhase::Idle;
            self.alpha = 0.0;
            return;
        }
        self.alpha = if full {
            1.0
        } else {
            self.alpha.max(self.config.reheat_alpha)
        };
        self.ticks_since_heat = 0;
        if !matches!(self.phase, LayoutPhase::Dragging(_)) {
            self.phase = LayoutPhase::Settling;
        }
    }

    // ========== Ticking ==========

    /// Advance one step; returns whether the simulation is still running
    pub fn tick(&mut self) -> bool {
        if self.phase == LayoutPhase::Idle {
            return false;
        }
        if self.bodies.is_empty() {
            self.phase = LayoutPhase::Idle;
            return false;
        }

        self.alpha += (self.alpha_target() - self.alpha) * self.config.alpha_decay;

        self.apply_links();
        self.apply_charge();
        self.apply_centering();
        self.apply_collisions();
        self.integrate();

        self.ticks += 1;
        self.ticks_since_heat = self.ticks_since_heat.saturating_add(1);

        if self.phase == LayoutPhase::Settling && self.should_settle() {
            for body in &mut self.bodies {
                body.velocity = Vec2::ZERO;
            }
            self.phase = LayoutPhase::Idle;
            debug!(ticks = self.ticks, alpha = self.alpha, "Layout settled");
            return false;
        }
        true
    }

    /// Tick until settled or `max_ticks` is reached; returns ticks run
    pub fn run_until_settled(&mut self, max_ticks: usize) -> usize {
        let mut ran = 0;
        while ran < max_ticks && !self.is_settled() {
            self.tick();
            ran += 1;
        }
        ran
    }

    /// Total kinetic energy of the free (unpinned) nodes
    pub fn kinetic_energy(&self) -> f64 {
        self.bodies
            .iter()
            .filter(|b| b.pin.is_none())
            .map(|b| 0.5 * b.velocity.length_squared())
            .sum()
    }

    fn alpha_target(&self) -> f64 {
        match self.phase {
            LayoutPhase::Dragging(_) => self.config.drag_alpha_target,
            _ => 0.0,
        }
    }

    fn should_settle(&self) -> bool {
        if self.alpha < self.config.alpha_min {
            return true;
        }
        let free = self.bodies.iter().filter(|b| b.pin.is_none()).count();
        if free == 0 {
            return true;
        }
        self.ticks_since_heat >= MIN_TICKS_BEFORE_SETTLE
            && self.kinetic_energy() / (free as f64) < self.config.energy_threshold
    }

    fn apply_links(&mut self) {
        if self.edges.is_empty() {
            return;
        }
        let mut degree = vec![0usize; self.bodies.len()];
        for &(s, t) in &self.edges {
            degree[s] += 1;
            degree[t] += 1;
        }

        let strength = self.config.link_strength * self.alpha;
        for &(s, t) in &self.edges {
            let predicted_s = self.bodies[s].position + self.bodies[s].velocity;
            let predicted_t = self.bodies[t].position + self.bodies[t].velocity;
            let mut delta = predicted_t - predicted_s;
            let mut distance = delta.length();
            if distance < 1e-6 {
                delta = jiggle(s, t);
                distance = delta.length();
            }
            let stretch = delta * ((distance - self.config.link_distance) / distance * strength);
            let bias = degree[s] as f64 / (degree[s] + degree[t]) as f64;
            self.bodies[t].velocity -= stretch * bias;
            self.bodies[s].velocity += stretch * (1.0 - bias);
        }
    }

    fn apply_charge(&mut self) {
        let strength = self.config.charge * self.alpha;
        let n = self.bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let mut delta = self.bodies[j].position - self.bodies[i].position;
                if delta.length_squared() < 1e-12 {
                    delta = jiggle(i, j);
                }
                let d2 = delta.length_squared().max(1.0);
                let push = delta * (strength / d2);
                self.bodies[i].velocity += push;
                self.bodies[j].velocity -= push;
            }
        }
    }

    fn apply_centering(&mut self) {
        let center = self.config.center();
        let strength = self.config.center_strength * self.alpha;
        for body in &mut self.bodies {
            body.velocity += (center - body.position) * strength;
        }
    }

    fn apply_collisions(&mut self) {
        let n = self.bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (ri, rj) = (self.bodies[i].radius, self.bodies[j].radius);
                let reach = ri + rj;
                let predicted_i = self.bodies[i].position + self.bodies[i].velocity;
                let predicted_j = self.bodies[j].position + self.bodies[j].velocity;
                let mut delta = predicted_i - predicted_j;
                if delta.length_squared() >= reach * reach {
                    continue;
                }
                if delta.length_squared() < 1e-12 {
                    delta = jiggle(i, j);
                }
                let distance = delta.length();
                let push = delta * ((reach - distance) / distance * self.config.collision_strength);
                let weight = (rj * rj) / (ri * ri + rj * rj);
                self.bodies[i].velocity += push * weight;
                self.bodies[j].velocity -= push * (1.0 - weight);
            }
        }
    }

    fn integrate(&mut self) {
        let retain = 1.0 - self.config.velocity_decay;
        let center = self.config.center();
        for body in &mut self.bodies {
            if let Some(pin) = body.pin {
                body.position = pin;
                body.velocity = Vec2::ZERO;
                continue;
            }
            body.velocity = body.velocity * retain;
            body.position += body.velocity;
            if !body.position.is_finite() || !body.velocity.is_finite() {
                body.position = center;
                body.velocity = Vec2::ZERO;
            }
        }
    }

    // ========== Drag ==========

    /// Pin a node under the pointer and keep the simulation hot
    pub fn drag_start(&mut self, id: &str, at: Vec2) -> Result<()> {
        let index = *self
            .index
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        if let LayoutPhase::Dragging(previous) = &self.phase
            && previous != id
            && let Some(&p) = self.index.get(previous)
        {
            self.bodies[p].pin = None;
        }

        let body = &mut self.bodies[index];
        body.pin = Some(at);
        body.position = at;
        body.velocity = Vec2::ZERO;

        self.alpha = self.alpha.max(self.config.drag_alpha_target);
        self.ticks_since_heat = 0;
        self.phase = LayoutPhase::Dragging(id.to_string());
        debug!(node_id = %id, x = at.x, y = at.y, "Drag started");
        Ok(())
    }

    /// Move the dragged node; returns false when no drag is in progress
    pub fn drag_move(&mut self, at: Vec2) -> bool {
        let LayoutPhase::Dragging(id) = &self.phase else {
            return false;
        };
        match self.index.get(id) {
            Some(&i) => {
                self.bodies[i].pin = Some(at);
                self.bodies[i].position = at;
                true
            }
            None => false,
        }
    }

    /// Release the dragged node where it is; forces resume from there
    pub fn drag_end(&mut self) -> Option<String> {
        if !matches!(self.phase, LayoutPhase::Dragging(_)) {
            return None;
        }
        let LayoutPhase::Dragging(id) = std::mem::replace(&mut self.phase, LayoutPhase::Settling)
        else {
            return None;
        };
        if let Some(&i) = self.index.get(&id) {
            let body = &mut self.bodies[i];
            if let Some(pin) = body.pin.take() {
                body.position = pin;
            }
            body.velocity = Vec2::ZERO;
        }
        self.phase = LayoutPhase::Settling;
        self.ticks_since_heat = 0;
        debug!(node_id = %id, "Drag released");
        Some(id)
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.index
            .get(id)
            .is_some_and(|&i| self.bodies[i].pin.is_some())
    }

    // ========== Read ==========

    pub fn position(&self, id: &str) -> Option<Vec2> {
        self.index.get(id).map(|&i| self.bodies[i].position)
    }

    pub fn positions(&self) -> Vec<NodePosition> {
        self.bodies
            .iter()
            .map(|b| NodePosition {
                id: b.id.clone(),
                x: b.position.x,
                y: b.position.y,
                radius: b.radius,
            })
            .collect()
    }
}

/// Deterministic tiny offset for coincident nodes
fn jiggle(i: usize, j: usize) -> Vec2 {
    Vec2::from_angle((i * 31 + j * 17) as f64) * 1e-3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::NodeKind;

    fn node(id: &str) -> Node {
        Node::new(id, NodeKind::Paper).with_id(id)
    }

    fn nodes(ids: &[&str]) -> Vec<Node> {
        ids.iter().map(|id| node(id)).collect()
    }

    fn settled(ids: &[&str], links: &[Link]) -> LayoutSimulation {
        let mut sim = LayoutSimulation::default();
        sim.set_graph(&nodes(ids), links);
        sim.run_until_settled(5_000);
        assert!(sim.is_settled());
        sim
    }

    #[test]
    fn test_empty_layout_is_idle() {
        let mut sim = LayoutSimulation::default();
        assert!(!sim.set_graph(&[], &[]));
        assert!(sim.is_settled());
        assert!(!sim.tick());
        assert_eq!(sim.run_until_settled(100), 0);
        assert!(sim.positions().is_empty());
    }

    #[test]
    fn test_settles_with_finite_positions() {
        let links = vec![
            Link::new("a", "b", "Cites"),
            Link::new("b", "c", "Cites"),
            Link::new("c", "d", "Extends"),
            Link::new("e", "a", "Cites"),
        ];
        let sim = settled(&["a", "b", "c", "d", "e", "f"], &links);
        assert!(sim.ticks() > 0);
        for p in sim.positions() {
            assert!(p.x.is_finite() && p.y.is_finite(), "{p:?}");
        }
    }

    #[test]
    fn test_linked_pair_rests_near_link_distance() {
        let sim = settled(&["a", "b"], &[Link::new("a", "b", "Cites")]);
        let distance = sim.position("a").unwrap().distance(sim.position("b").unwrap());
        let rest = sim.config().link_distance;
        assert!(distance > rest * 0.5 && distance < rest * 2.0, "distance {distance}");
    }

    #[test]
    fn test_collision_keeps_labels_apart() {
        let long = |id: &str| {
            Node::new("A rather long paper title about ensembles", NodeKind::Paper).with_id(id)
        };
        let mut sim = LayoutSimulation::default();
        sim.set_graph(&[long("a"), long("b"), long("c"), long("d")], &[]);
        sim.run_until_settled(5_000);

        let positions = sim.positions();
        for (i, a) in positions.iter().enumerate() {
            for b in &positions[i + 1..] {
                let distance = Vec2::new(a.x, a.y).distance(Vec2::new(b.x, b.y));
                assert!(distance >= (a.radius + b.radius) * 0.75, "{} and {} overlap", a.id, b.id);
            }
        }
    }

    #[test]
    fn test_surviving_nodes_keep_positions() {
        let mut sim = settled(&["a", "b"], &[Link::new("a", "b", "Cites")]);
        let a = sim.position("a").unwrap();
        let b = sim.position("b").unwrap();

        let changed = sim.set_graph(
            &nodes(&["a", "b", "c"]),
            &[Link::new("a", "b", "Cites"), Link::new("a", "c", "Cites")],
        );

        assert!(changed);
        assert_eq!(sim.phase(), &LayoutPhase::Settling);
        assert_eq!(sim.position("a"), Some(a));
        assert_eq!(sim.position("b"), Some(b));
        // Seeded beside its placed neighbour
        let c = sim.position("c").unwrap();
        assert!(c.distance(a) <= sim.config().link_distance * 0.5 + 1e-9);
    }

    #[test]
    fn test_unchanged_graph_does_not_reheat() {
        let links = [Link::new("a", "b", "Cites")];
        let mut sim = settled(&["a", "b"], &links);
        assert!(!sim.set_graph(&nodes(&["a", "b"]), &links));
        assert!(sim.is_settled());
    }

    #[test]
    fn test_shrinking_visible_set_reheats() {
        let mut sim = settled(&["a", "b", "c"], &[]);
        let a = sim.position("a").unwrap();
        assert!(sim.set_graph(&nodes(&["a", "b"]), &[]));
        assert_eq!(sim.len(), 2);
        assert_eq!(sim.position("a"), Some(a));
        assert!(sim.position("c").is_none());
        assert!(!sim.is_settled());
    }

    #[test]
    fn test_dangling_links_are_ignored() {
        let mut sim = LayoutSimulation::default();
        sim.set_graph(&nodes(&["a"]), &[Link::new("a", "ghost", "Cites")]);
        sim.run_until_settled(1_000);
        assert!(sim.position("a").unwrap().is_finite());
    }

    #[test]
    fn test_dragged_node_is_pinned_and_keeps_simulation_hot() {
        let mut sim = settled(&["a", "b"], &[Link::new("a", "b", "Cites")]);
        let b_before = sim.position("b").unwrap();
        let drop = Vec2::new(1000.0, 700.0);

        sim.drag_start("a", drop).unwrap();
        assert!(sim.is_pinned("a"));
        for _ in 0..50 {
            assert!(sim.tick());
        }
        assert_eq!(sim.position("a"), Some(drop));
        assert!(sim.alpha() >= sim.config().drag_alpha_target * 0.9);
        assert_ne!(sim.position("b"), Some(b_before));
    }

    #[test]
    fn test_drag_release_does_not_snap_back() {
        let mut sim = settled(&["a", "b"], &[Link::new("a", "b", "Cites")]);
        let before = sim.position("a").unwrap();
        let drop = before + Vec2::new(400.0, 0.0);

        sim.drag_start("a", drop).unwrap();
        sim.tick();
        assert_eq!(sim.drag_end(), Some("a".to_string()));
        assert!(!sim.is_pinned("a"));
        assert_eq!(sim.position("a"), Some(drop));

        sim.tick();
        let after = sim.position("a").unwrap();
        assert!(after.distance(drop) < 50.0);
        assert!(after.distance(before) > 300.0);

        sim.run_until_settled(5_000);
        assert!(sim.is_settled());
    }

    #[test]
    fn test_drag_unknown_node() {
        let mut sim = settled(&["a"], &[]);
        let err = sim.drag_start("missing", Vec2::ZERO).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(!sim.drag_move(Vec2::ZERO));
        assert_eq!(sim.drag_end(), None);
    }

    #[test]
    fn test_hiding_dragged_node_ends_drag() {
        let mut sim = settled(&["a", "b"], &[]);
        sim.drag_start("a", Vec2::new(10.0, 10.0)).unwrap();
        sim.set_graph(&nodes(&["b"]), &[]);
        assert_eq!(sim.phase(), &LayoutPhase::Settling);
    }

    #[test]
    fn test_placement_is_deterministic() {
        let mut first = LayoutSimulation::default();
        let mut second = LayoutSimulation::default();
        let ids = ["a", "b", "c", "d"];
        first.set_graph(&nodes(&ids), &[]);
        second.set_graph(&nodes(&ids), &[]);
        assert_eq!(first.positions(), second.positions());
    }

    #[test]
    fn test_radius_fits_label() {
        let config = LayoutConfig::default();
        assert_eq!(config.radius_for("ab"), config.min_radius);
        assert_eq!(config.radius_for(&"x".repeat(500)), config.max_radius);
        let mid = config.radius_for(&"x".repeat(20));
        assert!(mid > config.min_radius && mid < config.max_radius);
    }

    #[test]
    fn test_config_validation() {
        assert!(LayoutConfig::default().validate().is_ok());
        let bad = LayoutConfig {
            velocity_decay: 1.5,
            ..LayoutConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
