use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn generate_spectrum(
    energies: &[f64],
    peaks: &[(f64, f64, f64)],
    noise_level: f64,
    rng: &mut SimpleRng,
) -> Vec<f64> {
    energies
        .iter()
        .map(|&e| {
            let signal: f64 = peaks
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(e, mu, sigma, amp))
                .sum();
            // Keep intensities positive so `log(...)` derivations work on the sample.
            (signal + rng.gauss(0.0, noise_level)).abs() + 1e-6
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Writes a tab-separated file with one block per sample, separated by
/// comment lines, in the layout `plotframe` reads in block mode.
fn main() -> Result<()> {
    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_data.tsv".to_string());

    let mut rng = SimpleRng::new(42);

    // Energies: -2.0 → 2.0 eV, step 0.01
    let energies: Vec<f64> = (0..=400).map(|i| -2.0 + i as f64 * 0.01).collect();

    let samples: [(&str, Vec<(f64, f64, f64)>); 3] = [
        ("Sample_A", vec![(-1.2, 0.10, 0.8), (0.3, 0.05, 0.5), (1.1, 0.08, 0.3)]),
        ("Sample_B", vec![(-0.8, 0.07, 0.6), (0.0, 0.09, 0.7), (1.5, 0.06, 0.4)]),
        ("Sample_C", vec![(-1.6, 0.12, 0.9), (0.6, 0.04, 0.4), (1.3, 0.05, 0.5)]),
    ];

    let file = File::create(&output_path)
        .with_context(|| format!("failed to create {output_path}"))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "# generated by generate_sample (seed 42)")?;
    for (block, (name, peaks)) in samples.iter().enumerate() {
        let intensity = generate_spectrum(&energies, peaks, 0.005, &mut rng);

        if block > 0 {
            writeln!(out)?;
        }
        writeln!(out, "# {name}")?;
        writeln!(out, "k_point\tEnergy eV\tintensity")?;
        for (i, (&e, &y)) in energies.iter().zip(&intensity).enumerate() {
            let k = i as f64 / (energies.len() - 1) as f64;
            writeln!(out, "{k:.4}\t{e:.3}\t{y:.6}")?;
        }
    }
    out.flush()
        .with_context(|| format!("failed to write {output_path}"))?;

    println!(
        "Wrote {} blocks ({} rows each) to {output_path}",
        samples.len(),
        energies.len()
    );
    Ok(())
}
