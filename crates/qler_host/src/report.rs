//! Console tables for sweep and estimate results.

use qler_core::{CodeCatalog, ErrorRatePoint, SweepResult};

const CONFIDENCE_Z: f64 = 1.96;

/// Prints one table per channel family: a row per strength, a column per
/// code.
pub fn print_sweep(result: &SweepResult) {
    for set in &result.curve_sets {
        println!("\nLogical error rates under {}", set.channel_label);

        let mut header = format!("{:>8}", "p");
        for curve in &set.curves {
            header.push_str(&format!("  {:>18}", curve.code_id));
        }
        println!("{}", header);

        let rows = set.curves.first().map_or(0, |c| c.points.len());
        for row in 0..rows {
            let strength = set.curves[0].points[row].strength;
            let mut line = format!("{:>8.3}", strength);
            for curve in &set.curves {
                let p = &curve.points[row];
                line.push_str(&format!("  {:>8.4} ±{:<8.4}", p.rate, p.standard_error()));
            }
            println!("{}", line);
        }
    }
}

/// Prints a single estimate with its Wilson interval.
pub fn print_point(point: &ErrorRatePoint) {
    let (lo, hi) = point.wilson_interval(CONFIDENCE_Z);
    println!("\nEstimate");
    println!("Code:     {}", point.code_id);
    println!("Channel:  {}", point.channel_name);
    println!("Strength: {:.4}", point.strength);
    println!("Errors:   {}/{}", point.errors, point.trials);
    println!("Rate:     {:.5}", point.rate);
    println!("95% CI:   [{:.5}, {:.5}]", lo, hi);
}

/// Prints the code catalog and the channel families.
pub fn print_catalog(catalog: &CodeCatalog, channels: &[&str]) {
    println!("Codes");
    for def in catalog.definitions() {
        println!(
            "  {:<20} [[{}, {}]]  {} generators",
            def.name,
            def.n,
            def.k(),
            def.stabilizers.len()
        );
    }
    println!("Channels");
    for name in channels {
        println!("  {}", name);
    }
}
