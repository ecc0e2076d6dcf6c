//! Riftmap Headless Generation Harness
//!
//! Generates sectors for a range of seeds and checks the map invariants.
//! Runs entirely in-process, with no rendering or game-rule layer.
//!
//! Usage:
//!   cargo run -p riftmap-simtest
//!   cargo run -p riftmap-simtest -- --verbose --seeds 50
//!   cargo run -p riftmap-simtest -- --json path/to/sector_spec.json

use riftmap_logic::config::{ResolvedTables, SectorSpec};
use riftmap_logic::error::DiagnosticKind;
use riftmap_logic::generate::{generate, Sector};
use riftmap_logic::geometry::{segment_segment_distance, Point};
use riftmap_logic::loops::LoopOutcome;
use riftmap_logic::rift::Rip;

// ── Bundled spec (same JSON the tests use) ──────────────────────────────
const SPEC_JSON: &str = include_str!("../../../data/sector_spec.json");

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

struct Options {
    verbose: bool,
    seeds: u64,
    json: bool,
    spec_path: Option<String>,
}

fn parse_args() -> Options {
    let mut opts = Options {
        verbose: false,
        seeds: 20,
        json: false,
        spec_path: None,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--verbose" => opts.verbose = true,
            "--json" => opts.json = true,
            "--seeds" => {
                if let Some(n) = args.next().and_then(|v| v.parse().ok()) {
                    opts.seeds = n;
                }
            }
            other => opts.spec_path = Some(other.to_string()),
        }
    }
    opts
}

fn main() {
    let opts = parse_args();
    let level = if opts.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let spec = match load_spec(opts.spec_path.as_deref()) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("failed to load sector spec: {}", e);
            std::process::exit(2);
        }
    };

    if opts.json {
        let sector = match generate(&spec, 0) {
            Ok(sector) => sector,
            Err(e) => {
                eprintln!("generation failed: {}", e);
                std::process::exit(1);
            }
        };
        match sector.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("serialization failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!("=== Riftmap Generation Harness ===\n");

    let mut results = Vec::new();

    // 1. Spec validation
    results.extend(validate_spec(&spec));

    // 2. Per-seed invariants
    results.extend(validate_seeds(&spec, opts.seeds, opts.verbose));

    // 3. Determinism
    results.extend(validate_determinism(&spec));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || opts.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn load_spec(path: Option<&str>) -> Result<SectorSpec, String> {
    let text = match path {
        Some(p) => std::fs::read_to_string(p).map_err(|e| format!("{}: {}", p, e))?,
        None => SPEC_JSON.to_string(),
    };
    SectorSpec::from_json(&text).map_err(|e| e.to_string())
}

// ── 1. Spec ─────────────────────────────────────────────────────────────

fn validate_spec(spec: &SectorSpec) -> Vec<TestResult> {
    println!("--- Sector Spec ---");
    let mut results = Vec::new();

    let resolved = spec.resolve();
    results.push(TestResult {
        name: "spec_resolves".into(),
        passed: resolved.is_ok(),
        detail: match &resolved {
            Ok(t) => format!("{} categories in catalog", t.link_value.len()),
            Err(errors) => errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        },
    });

    results.push(TestResult {
        name: "spec_has_rings".into(),
        passed: !spec.rings.is_empty(),
        detail: format!("{} rings, {} rifts requested", spec.rings.len(), spec.rifts.count),
    });

    results
}

// ── 2. Per-seed invariants ──────────────────────────────────────────────

fn validate_seeds(spec: &SectorSpec, seeds: u64, verbose: bool) -> Vec<TestResult> {
    println!("--- Seeds 0..{} ---", seeds);
    let mut results = Vec::new();
    let Ok(tables) = spec.resolve() else {
        return results;
    };

    let mut generated = 0u64;
    let mut total_signals = 0usize;
    let mut total_rips = 0usize;
    let mut unbalanced = 0usize;
    let mut loops_failed = 0u64;

    for seed in 0..seeds {
        let sector = match generate(spec, seed) {
            Ok(s) => s,
            Err(e) => {
                results.push(TestResult {
                    name: format!("seed_{}_generates", seed),
                    passed: false,
                    detail: e.to_string(),
                });
                continue;
            }
        };
        generated += 1;
        total_signals += sector.signals.len();
        total_rips += sector.rips.len();
        unbalanced += sector.balance.iter().filter(|b| !b.converged).count();
        if matches!(sector.loop_outcome, Some(LoopOutcome::Failed { .. })) {
            loops_failed += 1;
        }

        if verbose {
            println!(
                "  seed {:>3}: attempt {}, {} signals, {} rips, {} joints, {} diagnostics",
                seed,
                sector.attempt,
                sector.signals.len(),
                sector.rips.len(),
                sector.joints.len(),
                sector.diagnostics.len()
            );
        }

        for (name, problem) in [
            ("zones_cover_signals", check_zone_membership(&sector)),
            ("rips_keep_clear", check_rip_clearance(&sector, spec)),
            ("imbalance_reported", check_balance_reported(&sector)),
            ("loop_outcome_consistent", check_loop_outcome(&sector)),
            ("start_zone_planets", check_start_zone(&sector, spec, &tables)),
        ] {
            if let Some(detail) = problem {
                results.push(TestResult {
                    name: format!("seed_{}_{}", seed, name),
                    passed: false,
                    detail,
                });
            }
        }
    }

    results.push(TestResult {
        name: "all_seeds_generate".into(),
        passed: generated == seeds,
        detail: format!("{}/{} seeds produced a sector", generated, seeds),
    });

    let n = generated.max(1) as f64;
    results.push(TestResult {
        name: "seed_averages".into(),
        passed: true,
        detail: format!(
            "avg {:.1} signals, {:.1} rips, {} unbalanced zones, {} loop failures",
            total_signals as f64 / n,
            total_rips as f64 / n,
            unbalanced,
            loops_failed
        ),
    });

    results
}

fn check_zone_membership(sector: &Sector) -> Option<String> {
    let listed: usize = sector.zones.iter().map(|z| z.signals.len()).sum();
    if listed != sector.signals.len() {
        return Some(format!(
            "{} signals listed in zones, {} on the map",
            listed,
            sector.signals.len()
        ));
    }
    for zone in &sector.zones {
        for id in &zone.signals {
            match sector.signal(*id) {
                Some(s) if s.zone == zone.id => {}
                Some(s) => return Some(format!("{:?} listed in zone {} but belongs to {}", id, zone.id.0, s.zone.0)),
                None => return Some(format!("{:?} listed in zone {} but missing", id, zone.id.0)),
            }
        }
    }
    None
}

fn check_rip_clearance(sector: &Sector, spec: &SectorSpec) -> Option<String> {
    let min_gap = 2.0 * spec.scale.world(spec.rifts.pad);
    let clearance = spec.scale.world(spec.rifts.origin_clearance);
    for (i, a) in sector.rips.iter().enumerate() {
        if a.closest_approach < clearance {
            return Some(format!("rip {} reaches {:.3} from origin", a.id.0, a.closest_approach));
        }
        for b in &sector.rips[i + 1..] {
            let gap = rip_gap(sector, a, b);
            if gap < min_gap {
                return Some(format!("rips {} and {} only {:.3} apart", a.id.0, b.id.0, gap));
            }
        }
    }
    None
}

fn rip_gap(sector: &Sector, a: &Rip, b: &Rip) -> f64 {
    let disc = sector
        .joints
        .iter()
        .find(|j| j.rips.contains(&a.id) && j.rips.contains(&b.id))
        .map(|j| (j.center, j.radius));
    let inside = |p: Point, q: Point| disc.is_some_and(|(c, r)| p.distance(c) < r || q.distance(c) < r);

    let mut gap = f64::INFINITY;
    for wa in a.samples.windows(2) {
        if inside(wa[0], wa[1]) {
            continue;
        }
        for wb in b.samples.windows(2) {
            if !inside(wb[0], wb[1]) {
                gap = gap.min(segment_segment_distance(wa[0], wa[1], wb[0], wb[1]));
            }
        }
    }
    gap
}

fn check_balance_reported(sector: &Sector) -> Option<String> {
    for b in sector.balance.iter().filter(|b| !b.converged) {
        let prefix = format!("zone {} ", b.zone.0);
        let reported = sector
            .diagnostics
            .iter()
            .any(|d| d.pass == "link_balance" && d.message.starts_with(&prefix));
        if !reported {
            return Some(format!(
                "zone {} at {:.2} vs target {:.2} with no diagnostic",
                b.zone.0, b.after, b.target
            ));
        }
    }
    None
}

fn check_loop_outcome(sector: &Sector) -> Option<String> {
    match &sector.loop_outcome {
        Some(LoopOutcome::Failed { attempts }) => {
            let reported = sector
                .diagnostics
                .iter()
                .any(|d| d.pass == "loop_guarantee" && d.kind == DiagnosticKind::RetryExhausted);
            (!reported).then(|| format!("loop failed after {} attempts silently", attempts))
        }
        _ => None,
    }
}

fn check_start_zone(sector: &Sector, spec: &SectorSpec, tables: &ResolvedTables) -> Option<String> {
    let Some(origin) = sector.zones.first() else {
        return Some("no zones".into());
    };
    let planets = origin
        .signals
        .iter()
        .filter_map(|id| sector.signal(*id))
        .filter(|s| tables.is_planet(s.category))
        .count();
    (planets < spec.start_zone.min_planets as usize)
        .then(|| format!("{} planets in the origin zone, need {}", planets, spec.start_zone.min_planets))
}

// ── 3. Determinism ──────────────────────────────────────────────────────

fn validate_determinism(spec: &SectorSpec) -> Vec<TestResult> {
    println!("--- Determinism ---");
    let mut results = Vec::new();

    let same = match (generate(spec, 77), generate(spec, 77)) {
        (Ok(a), Ok(b)) => a == b,
        (Err(a), Err(b)) => a == b,
        _ => false,
    };
    results.push(TestResult {
        name: "same_seed_same_sector".into(),
        passed: same,
        detail: "seed 77 generated twice".into(),
    });

    results
}
