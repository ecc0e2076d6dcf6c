//! Rift generation.
//!
//! Each requested rift runs a small state machine inside an outer retry
//! budget:
//!
//! | State | Leaves to | When |
//! |-------|-----------|------|
//! | `SeekingStart` | `Growing` | a start keypoint snapped between two signals, or a free rift end reused |
//! | `Growing` | `Extended` | accumulated length reached the drawn target (or the minimum when stuck) |
//! | `Extended` | `Accepted` | the fitted spline passes every clearance test |
//! | any | `Abandoned` | no start, stuck below minimum length, or a failed test |
//!
//! Accepted rips are frozen and indexed by their padded bounding box. After
//! every request has been served, joints are synthesized where rip ends
//! meet, signals under a rip or inside a joint are evacuated, signals just
//! beside a rip are tagged, and the rip zones are resolved.

use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_4, TAU};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::category::Quirk;
use crate::config::RiftSpec;
use crate::context::GenContext;
use crate::curve::{CurveEquation, SplineCurve};
use crate::error::{DiagnosticKind, GenError};
use crate::geometry::{
    point_segment_distance, polyline_distance, polyline_length, segment_crosses_polyline,
    segment_segment_distance, turn_angle, Aabb, Point,
};
use crate::pipeline::Refinement;
use crate::retry::{Exhaustion, Retry, RetryOutcome, Settled};
use crate::signal::SignalId;
use crate::spatial::ShapeIndex;

/// Two end points closer than this are the same point.
const SAME_POINT: f64 = 1e-9;

/// Share of a rip's length over which a tapered end narrows to nothing.
const TAPER_FRACTION: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RipId(pub u16);

impl RipId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A control point of a rip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub pos: Point,
    /// Signal pair the point was snapped between. `None` for extrapolated
    /// ends and for starts reused from another rip.
    pub anchors: Option<(SignalId, SignalId)>,
    /// Interpolation factor along the anchor pair.
    pub t: f64,
}

impl Keypoint {
    fn free(pos: Point) -> Self {
        Self {
            pos,
            anchors: None,
            t: 0.0,
        }
    }
}

/// Which ends of a rip narrow to a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Taper {
    pub start: bool,
    pub end: bool,
}

impl Taper {
    /// Width multiplier at `frac ∈ [0, 1]` along the rip.
    pub fn factor(self, frac: f64) -> f64 {
        let mut f: f64 = 1.0;
        if self.start && frac < TAPER_FRACTION {
            f = f.min(frac / TAPER_FRACTION);
        }
        if self.end && frac > 1.0 - TAPER_FRACTION {
            f = f.min((1.0 - frac) / TAPER_FRACTION);
        }
        f.max(0.0)
    }
}

/// An accepted rift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rip {
    pub id: RipId,
    /// Position of the rift in request order.
    pub request: usize,
    pub keypoints: Vec<Keypoint>,
    pub curve: SplineCurve,
    pub width: f64,
    pub taper: Taper,
    pub samples: Vec<Point>,
    pub length: f64,
    /// Closest approach of the sampled curve to the origin.
    pub closest_approach: f64,
}

impl Rip {
    pub fn ends(&self) -> [Point; 2] {
        [
            self.samples.first().copied().unwrap_or_default(),
            self.samples.last().copied().unwrap_or_default(),
        ]
    }

    pub fn has_end_at(&self, p: Point) -> bool {
        self.ends().iter().any(|e| e.distance(p) < SAME_POINT)
    }

    /// Distance from `p` to the sampled curve and the index of the nearest
    /// sample segment.
    pub fn nearest_segment(&self, p: Point) -> (f64, usize) {
        if self.samples.len() < 2 {
            return (polyline_distance(p, &self.samples), 0);
        }
        self.samples
            .windows(2)
            .enumerate()
            .map(|(i, w)| (point_segment_distance(p, w[0], w[1]), i))
            .fold((f64::INFINITY, 0), |best, cur| if cur.0 < best.0 { cur } else { best })
    }

    /// Half width at sample segment `i`, tapered toward tapered ends.
    pub fn half_width_at(&self, i: usize) -> f64 {
        let last = self.samples.len().saturating_sub(1).max(1);
        let frac = (i as f64 + 0.5) / last as f64;
        0.5 * self.width * self.taper.factor(frac.clamp(0.0, 1.0))
    }
}

/// Junction where rip ends meet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub center: Point,
    pub radius: f64,
    pub rips: Vec<RipId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AbandonReason {
    NoStart,
    Stuck,
    OriginClearance,
    ForcedBand,
    Collision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiftState {
    SeekingStart,
    Growing,
    Extended,
    Accepted,
    Abandoned(AbandonReason),
}

impl RiftState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RiftState::Accepted | RiftState::Abandoned(_))
    }
}

/// Accepted rips, their joints, and a bounding-box index over both.
#[derive(Default)]
pub struct RiftNetwork {
    pub rips: Vec<Rip>,
    pub joints: Vec<Joint>,
    index: ShapeIndex<RipId>,
}

impl RiftNetwork {
    pub fn len(&self) -> usize {
        self.rips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rips.is_empty()
    }

    pub fn get(&self, id: RipId) -> Option<&Rip> {
        self.rips.get(id.index())
    }

    /// The rip generated for request `request`, if it was accepted.
    pub fn by_request(&self, request: usize) -> Option<&Rip> {
        self.rips.iter().find(|r| r.request == request)
    }

    /// Freeze `rip` into the network. Its bounding box is padded by `pad`.
    pub fn insert(&mut self, mut rip: Rip, pad: f64) -> RipId {
        let id = RipId(self.rips.len() as u16);
        rip.id = id;
        if let Some(bb) = Aabb::from_points(&rip.samples) {
            self.index.insert(bb.padded(pad), id);
        }
        self.rips.push(rip);
        id
    }

    /// Rips whose padded box comes within `reach` of `p`.
    pub fn near(&self, p: Point, reach: f64) -> Vec<&Rip> {
        self.index
            .overlapping(&Aabb::around(p, reach))
            .into_iter()
            .filter_map(|id| self.get(id))
            .collect()
    }

    /// True when the segment `a`–`b` crosses any rip.
    pub fn blocks(&self, a: Point, b: Point) -> bool {
        if self.rips.is_empty() {
            return false;
        }
        let Some(bb) = Aabb::from_points(&[a, b]) else {
            return false;
        };
        self.index
            .overlapping(&bb)
            .into_iter()
            .filter_map(|id| self.get(id))
            .any(|rip| segment_crosses_polyline(a, b, &rip.samples))
    }

    /// Rip ends not shared with any other rip, with their outward heading.
    pub fn free_ends(&self) -> Vec<(Point, f64)> {
        let mut ends = Vec::new();
        for rip in &self.rips {
            let n = rip.samples.len();
            if n < 2 {
                continue;
            }
            let candidates = [
                (rip.samples[0], (rip.samples[0] - rip.samples[1]).angle()),
                (rip.samples[n - 1], (rip.samples[n - 1] - rip.samples[n - 2]).angle()),
            ];
            for (p, heading) in candidates {
                let shared = self
                    .rips
                    .iter()
                    .any(|other| other.id != rip.id && other.has_end_at(p));
                if !shared {
                    ends.push((p, heading));
                }
            }
        }
        ends
    }

    /// True when `samples` come within `2 * pad` of an accepted rip.
    /// Segments inside `joint` are ignored against the rips ending there.
    pub fn collides(&self, samples: &[Point], pad: f64, joint: Option<(Point, f64)>) -> bool {
        let Some(bb) = Aabb::from_points(samples) else {
            return false;
        };
        self.index
            .overlapping(&bb.padded(pad))
            .into_iter()
            .filter_map(|id| self.get(id))
            .any(|other| {
                let exempt = joint.filter(|(c, _)| other.has_end_at(*c));
                too_close(samples, &other.samples, 2.0 * pad, exempt)
            })
    }

    /// Build a joint at every point where two or more rip ends meet.
    pub fn synthesize_joints(&mut self, radius: f64) {
        self.joints.clear();
        for rip in &self.rips {
            for end in rip.ends() {
                if self.joints.iter().any(|j| j.center.distance(end) < SAME_POINT) {
                    continue;
                }
                let members: Vec<RipId> = self
                    .rips
                    .iter()
                    .filter(|r| r.has_end_at(end))
                    .map(|r| r.id)
                    .collect();
                if members.len() >= 2 {
                    self.joints.push(Joint {
                        center: end,
                        radius,
                        rips: members,
                    });
                }
            }
        }
    }

    /// Pairs of rips closer than `2 * pad` outside the joints they share.
    pub fn clearance_violations(&self, pad: f64) -> Vec<(RipId, RipId)> {
        let mut found = Vec::new();
        for (i, a) in self.rips.iter().enumerate() {
            for b in &self.rips[i + 1..] {
                let exempt = self
                    .joints
                    .iter()
                    .find(|j| j.rips.contains(&a.id) && j.rips.contains(&b.id))
                    .map(|j| (j.center, j.radius));
                if too_close(&a.samples, &b.samples, 2.0 * pad, exempt) {
                    found.push((a.id, b.id));
                }
            }
        }
        found
    }
}

fn touches_disc(a: Point, b: Point, disc: Option<(Point, f64)>) -> bool {
    disc.is_some_and(|(c, r)| a.distance(c) < r || b.distance(c) < r)
}

fn too_close(a: &[Point], b: &[Point], min_gap: f64, exempt: Option<(Point, f64)>) -> bool {
    for wa in a.windows(2) {
        if touches_disc(wa[0], wa[1], exempt) {
            continue;
        }
        for wb in b.windows(2) {
            if touches_disc(wb[0], wb[1], exempt) {
                continue;
            }
            if segment_segment_distance(wa[0], wa[1], wb[0], wb[1]) < min_gap {
                return true;
            }
        }
    }
    false
}

// ── Refinement ──

pub struct RiftGeneration;

impl Refinement for RiftGeneration {
    fn name(&self) -> &str {
        "rifts"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn apply(&self, ctx: &mut GenContext<'_>) -> Result<(), GenError> {
        let sector = ctx.spec;
        let spec = &sector.rifts;
        let mut rng = ctx.stream("rifts");

        for request in 0..spec.count {
            let mut tally: BTreeMap<AbandonReason, u32> = BTreeMap::new();
            let retry = Retry::new(spec.outer_retries, Exhaustion::Warn);
            let settled = retry.run_settled(self.name(), |_| {
                match grow_rift(ctx, request, &mut rng) {
                    Ok(rip) => Some(rip),
                    Err(reason) => {
                        *tally.entry(reason).or_insert(0) += 1;
                        None
                    }
                }
            })?;

            match settled {
                Settled::Done { value, attempts } => {
                    let pad = ctx.world(spec.pad);
                    let id = ctx.rifts.insert(value, pad);
                    log::debug!("rift {} accepted as {:?} after {} attempts", request, id, attempts);
                }
                Settled::GaveUp { attempts } => {
                    ctx.diagnose(
                        self.name(),
                        DiagnosticKind::RetryExhausted,
                        format!(
                            "rift {} abandoned after {} attempts {:?}",
                            request, attempts, tally
                        ),
                    );
                }
            }
        }

        let joint_radius = ctx.world(spec.joint_radius);
        ctx.rifts.synthesize_joints(joint_radius);
        evacuate(ctx);
        ctx.rip_zones = crate::topology::build_rip_zones(ctx);
        Ok(())
    }
}

/// Forced closest approach for `request`, spec units.
fn forced_distance(spec: &RiftSpec, request: usize) -> Option<f64> {
    if request < spec.forced_count {
        spec.forced_closeness.get(request).copied()
    } else {
        None
    }
}

/// A rift under construction.
struct Growth {
    keypoints: Vec<Keypoint>,
    heading: f64,
    target: f64,
    length: f64,
    /// Point shared with an accepted rip when the start was reused.
    joint: Option<Point>,
}

impl Growth {
    fn last(&self) -> Point {
        self.keypoints.last().map(|k| k.pos).unwrap_or_default()
    }

    /// True when `a`–`b` would cross an earlier segment of the chain.
    fn crosses_self(&self, a: Point, b: Point) -> bool {
        let pts: Vec<Point> = self.keypoints.iter().map(|k| k.pos).collect();
        pts.len() >= 3 && segment_crosses_polyline(a, b, &pts[..pts.len() - 1])
    }
}

/// One full pass of the state machine for request `request`.
fn grow_rift<R: Rng + ?Sized>(
    ctx: &GenContext<'_>,
    request: usize,
    rng: &mut R,
) -> Result<Rip, AbandonReason> {
    let mut state = RiftState::SeekingStart;
    let mut growth: Option<Growth> = None;
    let mut accepted: Option<Rip> = None;

    while !state.is_terminal() {
        state = match state {
            RiftState::SeekingStart => match seek_start(ctx, request, rng) {
                Some(g) => {
                    growth = Some(g);
                    RiftState::Growing
                }
                None => RiftState::Abandoned(AbandonReason::NoStart),
            },
            RiftState::Growing => match growth.as_mut() {
                Some(g) => {
                    if grow(ctx, g, rng) {
                        extend_ends(ctx, g);
                        RiftState::Extended
                    } else {
                        RiftState::Abandoned(AbandonReason::Stuck)
                    }
                }
                None => RiftState::Abandoned(AbandonReason::Stuck),
            },
            RiftState::Extended => match growth.as_ref().map(|g| finish(ctx, request, g, rng)) {
                Some(Ok(rip)) => {
                    accepted = Some(rip);
                    RiftState::Accepted
                }
                Some(Err(reason)) => RiftState::Abandoned(reason),
                None => RiftState::Abandoned(AbandonReason::Stuck),
            },
            terminal => terminal,
        };
        log::trace!("rift {} -> {:?}", request, state);
    }

    match (state, accepted) {
        (RiftState::Accepted, Some(rip)) => Ok(rip),
        (RiftState::Abandoned(reason), _) => Err(reason),
        _ => Err(AbandonReason::Stuck),
    }
}

/// Snap `probe` onto the segment between its two nearest signals.
fn snap<R: Rng + ?Sized>(ctx: &GenContext<'_>, probe: Point, rng: &mut R) -> Option<Keypoint> {
    let near = ctx
        .signals
        .nearest(probe, 2, ctx.world(ctx.spec.rifts.snap_radius));
    if near.len() < 2 {
        return None;
    }
    let (a, b) = (near[0].0, near[1].0);
    let pa = ctx.signals.get(a)?.pos;
    let pb = ctx.signals.get(b)?.pos;
    let t = rng.gen_range(0.25..=0.75);
    Some(Keypoint {
        pos: pa.lerp(pb, t),
        anchors: Some((a, b)),
        t,
    })
}

fn seek_start<R: Rng + ?Sized>(ctx: &GenContext<'_>, request: usize, rng: &mut R) -> Option<Growth> {
    let spec = &ctx.spec.rifts;
    let target = ctx.world(rng.gen_range(spec.min_length..=spec.max_length));

    if spec.joint_chance > 0.0 && rng.gen_bool(spec.joint_chance) {
        let ends = ctx.rifts.free_ends();
        if !ends.is_empty() {
            let (pos, heading) = ends[rng.gen_range(0..ends.len())];
            return Some(Growth {
                keypoints: vec![Keypoint::free(pos)],
                heading,
                target,
                length: 0.0,
                joint: Some(pos),
            });
        }
    }

    let forced = forced_distance(spec, request);
    let (lo, hi) = match forced {
        Some(d) => (d, d + spec.forced_band * 0.5),
        None => (spec.start_min_radius, spec.start_max_radius),
    };
    let radius = ctx.world(rng.gen_range(lo..=hi));
    let probe = Point::polar(rng.gen_range(0.0..TAU), radius);
    let start = snap(ctx, probe, rng)?;

    // Forced rifts head outward so the start stays the closest approach.
    let heading = if forced.is_some() {
        start.pos.angle() + rng.gen_range(-FRAC_PI_4..=FRAC_PI_4)
    } else {
        rng.gen_range(0.0..TAU)
    };

    Some(Growth {
        keypoints: vec![start],
        heading,
        target,
        length: 0.0,
        joint: None,
    })
}

/// Extend the chain until it reaches its target length. Returns false when
/// it gets stuck below the minimum length.
fn grow<R: Rng + ?Sized>(ctx: &GenContext<'_>, g: &mut Growth, rng: &mut R) -> bool {
    let spec = &ctx.spec.rifts;
    let min_length = ctx.world(spec.min_length);
    let (step_min, step_max) = (ctx.world(spec.step_min), ctx.world(spec.step_max));
    let jitter = spec.max_heading_jitter.abs();
    let retry = Retry::new(spec.inner_retries, Exhaustion::Warn);

    while g.length < g.target {
        let last = g.last();
        let free_first_step = g.keypoints.len() == 1 && g.joint.is_none();
        let proposal = retry.run(|_| {
            let heading = g.heading + rng.gen_range(-jitter..=jitter);
            let probe = last + Point::polar(heading, rng.gen_range(step_min..=step_max));
            let key = snap(ctx, probe, rng)?;
            let seg = key.pos - last;
            if seg.length() < step_min * 0.5 {
                return None;
            }
            if !free_first_step && turn_angle(g.heading, seg.angle()) > spec.max_turn {
                return None;
            }
            if g.crosses_self(last, key.pos) {
                return None;
            }
            Some(key)
        });

        match proposal {
            RetryOutcome::Succeeded { value, .. } => {
                g.length += value.pos.distance(last);
                g.heading = (value.pos - last).angle();
                g.keypoints.push(value);
            }
            RetryOutcome::Exhausted { .. } => return g.length >= min_length,
        }
    }
    true
}

/// Extrapolate free ends along their tangent.
fn extend_ends(ctx: &GenContext<'_>, g: &mut Growth) {
    let ext = ctx.world(ctx.spec.rifts.end_extension);
    let n = g.keypoints.len();
    if ext <= 0.0 || n < 2 {
        return;
    }
    let tail = g.keypoints[n - 1].pos;
    let dir = (tail - g.keypoints[n - 2].pos).normalized();
    g.keypoints.push(Keypoint::free(tail + dir * ext));

    if g.joint.is_none() {
        let head = g.keypoints[0].pos;
        let dir = (head - g.keypoints[1].pos).normalized();
        g.keypoints.insert(0, Keypoint::free(head + dir * ext));
    }
}

/// Fit, sample and test the grown chain.
fn finish<R: Rng + ?Sized>(
    ctx: &GenContext<'_>,
    request: usize,
    g: &Growth,
    rng: &mut R,
) -> Result<Rip, AbandonReason> {
    let spec = &ctx.spec.rifts;
    if g.keypoints.len() < 2 {
        return Err(AbandonReason::Stuck);
    }
    let curve = SplineCurve::new(g.keypoints.iter().map(|k| k.pos).collect());
    let samples = curve.sample(polyline_length(&curve.control), ctx.world(spec.sample_step));

    let closest = polyline_distance(Point::ORIGIN, &samples);
    if closest < ctx.world(spec.origin_clearance) {
        return Err(AbandonReason::OriginClearance);
    }
    if let Some(d) = forced_distance(spec, request) {
        if (closest - ctx.world(d)).abs() > ctx.world(spec.forced_band) {
            return Err(AbandonReason::ForcedBand);
        }
    }

    let joint = g.joint.map(|c| (c, ctx.world(spec.joint_radius)));
    if ctx.rifts.collides(&samples, ctx.world(spec.pad), joint) {
        return Err(AbandonReason::Collision);
    }

    let width = ctx.world(rng.gen_range(spec.width_min..=spec.width_max));
    let taper = Taper {
        start: g.joint.is_none() && rng.gen_bool(spec.taper_chance),
        end: rng.gen_bool(spec.taper_chance),
    };

    Ok(Rip {
        id: RipId(0),
        request,
        keypoints: g.keypoints.clone(),
        curve,
        width,
        taper,
        length: polyline_length(&samples),
        closest_approach: closest,
        samples,
    })
}

/// Remove signals under rips or inside joints; tag the ones just beside.
fn evacuate(ctx: &mut GenContext<'_>) {
    if ctx.rifts.is_empty() {
        return;
    }
    let margin = ctx.world(ctx.spec.rifts.tag_margin);
    let reach = ctx.world(ctx.spec.rifts.width_max) * 0.5 + margin;
    let mut removed = Vec::new();
    let mut tagged = Vec::new();

    for s in ctx.signals.iter() {
        if ctx
            .rifts
            .joints
            .iter()
            .any(|j| s.pos.distance(j.center) < j.radius)
        {
            removed.push(s.id);
            continue;
        }
        let gap = ctx
            .rifts
            .near(s.pos, reach)
            .into_iter()
            .map(|rip| {
                let (d, i) = rip.nearest_segment(s.pos);
                d - rip.half_width_at(i)
            })
            .fold(f64::INFINITY, f64::min);
        if gap < 0.0 {
            removed.push(s.id);
        } else if gap < margin {
            tagged.push(s.id);
        }
    }

    for id in &removed {
        ctx.remove_signal(*id);
    }
    for id in &tagged {
        if let Some(s) = ctx.signals.get_mut(*id) {
            s.quirk = Some(Quirk::riftside());
        }
    }
    log::debug!(
        "rifts evacuated {} signals, tagged {} riftside",
        removed.len(),
        tagged.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SectorSpec;

    fn rip_from(points: Vec<Point>, width: f64) -> Rip {
        let curve = SplineCurve::new(points);
        let samples = curve.sample(polyline_length(&curve.control), 0.1);
        Rip {
            id: RipId(0),
            request: 0,
            keypoints: curve.control.iter().map(|p| Keypoint::free(*p)).collect(),
            width,
            taper: Taper::default(),
            length: polyline_length(&samples),
            closest_approach: polyline_distance(Point::ORIGIN, &samples),
            samples,
            curve,
        }
    }

    fn generate_rifts(spec: &SectorSpec, seed: u64) -> (Vec<Rip>, Vec<Joint>, usize) {
        let tables = spec.resolve().unwrap();
        let mut ctx = GenContext::new(spec, &tables, seed, 0);
        crate::zone::scatter(&mut ctx);
        crate::classify::classify_all(&mut ctx);
        RiftGeneration.apply(&mut ctx).unwrap();
        let violations = ctx.rifts.clearance_violations(spec.rifts.pad).len();
        (ctx.rifts.rips.clone(), ctx.rifts.joints.clone(), violations)
    }

    #[test]
    fn test_blocks_crossing_segment() {
        let mut net = RiftNetwork::default();
        net.insert(rip_from(vec![Point::new(0.0, -2.0), Point::new(0.0, 2.0)], 0.1), 0.2);
        assert!(net.blocks(Point::new(-1.0, 0.0), Point::new(1.0, 0.0)));
        assert!(!net.blocks(Point::new(0.5, 0.0), Point::new(1.5, 0.0)));
    }

    #[test]
    fn test_collision_uses_padding() {
        let mut net = RiftNetwork::default();
        net.insert(rip_from(vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0)], 0.1), 0.2);
        let near = vec![Point::new(0.0, 0.3), Point::new(4.0, 0.3)];
        let far = vec![Point::new(0.0, 0.5), Point::new(4.0, 0.5)];
        assert!(net.collides(&near, 0.2, None));
        assert!(!net.collides(&far, 0.2, None));
    }

    #[test]
    fn test_joint_disc_is_exempt() {
        let mut net = RiftNetwork::default();
        net.insert(rip_from(vec![Point::new(-3.0, 0.0), Point::new(0.0, 0.0)], 0.1), 0.2);
        let branch = vec![Point::new(0.0, 0.0), Point::new(2.0, 2.0)];
        assert!(net.collides(&branch, 0.2, None));
        assert!(!net.collides(&branch, 0.2, Some((Point::ORIGIN, 0.5))));
    }

    #[test]
    fn test_joints_synthesized_at_shared_ends() {
        let mut net = RiftNetwork::default();
        net.insert(rip_from(vec![Point::new(-3.0, 0.0), Point::new(0.0, 0.0)], 0.1), 0.2);
        net.insert(rip_from(vec![Point::new(0.0, 0.0), Point::new(3.0, 3.0)], 0.1), 0.2);
        net.insert(rip_from(vec![Point::new(5.0, -5.0), Point::new(6.0, -6.0)], 0.1), 0.2);
        net.synthesize_joints(0.35);
        assert_eq!(net.joints.len(), 1);
        assert_eq!(net.joints[0].rips, vec![RipId(0), RipId(1)]);
        assert_eq!(net.free_ends().len(), 4);
    }

    #[test]
    fn test_taper_narrows_ends() {
        let taper = Taper {
            start: true,
            end: false,
        };
        assert_eq!(taper.factor(0.0), 0.0);
        assert!((taper.factor(0.1) - 0.5).abs() < 1e-12);
        assert_eq!(taper.factor(0.5), 1.0);
        assert_eq!(taper.factor(1.0), 1.0);
    }

    #[test]
    fn test_generated_rifts_keep_clear() {
        let spec = SectorSpec::default();
        for seed in 0..4 {
            let (rips, _, violations) = generate_rifts(&spec, seed);
            assert_eq!(violations, 0, "seed {}", seed);
            for rip in &rips {
                assert!(rip.closest_approach >= spec.rifts.origin_clearance);
                assert!(rip.samples.len() >= 2);
            }
        }
    }

    #[test]
    fn test_rifts_are_deterministic() {
        let spec = SectorSpec::default();
        let (a, _, _) = generate_rifts(&spec, 42);
        let (b, _, _) = generate_rifts(&spec, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_joined_rifts_share_a_joint() {
        let mut spec = SectorSpec::default();
        spec.rifts.joint_chance = 1.0;
        spec.rifts.outer_retries = 200;
        for seed in 0..4 {
            let (rips, joints, violations) = generate_rifts(&spec, seed);
            assert_eq!(violations, 0, "seed {}", seed);
            for joint in &joints {
                assert!(joint.rips.len() >= 2);
                for id in &joint.rips {
                    assert!(rips[id.index()].has_end_at(joint.center));
                }
            }
        }
    }

    #[test]
    fn test_evacuation_clears_rip_and_tags_neighbors() {
        let spec = SectorSpec::default();
        let tables = spec.resolve().unwrap();
        let mut ctx = GenContext::new(&spec, &tables, 7, 0);
        crate::zone::scatter(&mut ctx);
        crate::classify::classify_all(&mut ctx);
        RiftGeneration.apply(&mut ctx).unwrap();

        for s in ctx.signals.iter() {
            for rip in &ctx.rifts.rips {
                let (d, i) = rip.nearest_segment(s.pos);
                assert!(d >= rip.half_width_at(i), "signal {:?} left under a rip", s.id);
            }
            if s.quirk.as_ref().is_some_and(|q| q.0 == Quirk::RIFTSIDE) {
                let near = ctx
                    .rifts
                    .rips
                    .iter()
                    .map(|r| r.nearest_segment(s.pos).0)
                    .fold(f64::INFINITY, f64::min);
                assert!(near < spec.rifts.width_max * 0.5 + spec.rifts.tag_margin);
            }
        }
    }
}
