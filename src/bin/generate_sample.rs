use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

/// Write a synthetic employee attrition dataset.
#[derive(Debug, Parser)]
#[command(name = "generate_sample", version)]
struct Args {
    /// Number of employees
    #[arg(long, default_value_t = 1470)]
    rows: usize,

    /// PRNG seed; the same seed always produces the same file
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output CSV path
    #[arg(long, default_value = "EA.csv")]
    output: PathBuf,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Employee {
    employee_number: usize,
    age: i64,
    attrition: &'static str,
    department: &'static str,
    distance_from_home: i64,
    job_level: i64,
    job_role: &'static str,
    monthly_income: i64,
    over_time: &'static str,
    total_working_years: i64,
    work_life_balance: i64,
    years_at_company: i64,
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
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
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

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Index drawn with probability proportional to `weights`.
    fn weighted(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        let mut target = self.next_f64() * total;
        for (i, w) in weights.iter().enumerate() {
            if target < *w {
                return i;
            }
            target -= w;
        }
        weights.len() - 1
    }
}

/// Department, its share of the workforce, and its roles with relative weights.
const DEPARTMENTS: [(&str, f64, &[(&str, f64)]); 3] = [
    (
        "Research & Development",
        0.65,
        &[
            ("Research Scientist", 0.30),
            ("Laboratory Technician", 0.27),
            ("Manufacturing Director", 0.15),
            ("Healthcare Representative", 0.14),
            ("Research Director", 0.08),
            ("Manager", 0.06),
        ],
    ),
    (
        "Sales",
        0.30,
        &[
            ("Sales Executive", 0.73),
            ("Sales Representative", 0.19),
            ("Manager", 0.08),
        ],
    ),
    (
        "Human Resources",
        0.05,
        &[("Human Resources", 0.83), ("Manager", 0.17)],
    ),
];

fn generate(rng: &mut SimpleRng, employee_number: usize) -> Employee {
    let dept_weights: Vec<f64> = DEPARTMENTS.iter().map(|d| d.1).collect();
    let (department, _, roles) = DEPARTMENTS[rng.weighted(&dept_weights)];
    let role_weights: Vec<f64> = roles.iter().map(|r| r.1).collect();
    let job_role = roles[rng.weighted(&role_weights)].0;

    let age = rng.gauss(37.0, 9.0).round().clamp(18.0, 60.0) as i64;
    let total_working_years = ((age - 18) as f64 * rng.next_f64()).round() as i64;
    let years_at_company = (total_working_years as f64 * rng.next_f64()).round() as i64;

    let seniority = if matches!(job_role, "Manager" | "Research Director") {
        3.0
    } else {
        0.0
    };
    let job_level = (1.0 + seniority + total_working_years as f64 / 10.0 + rng.gauss(0.0, 0.6))
        .round()
        .clamp(1.0, 5.0) as i64;
    let monthly_income = (job_level as f64 * 3800.0 - 1500.0 + rng.gauss(0.0, 900.0))
        .round()
        .max(1009.0) as i64;

    let over_time = rng.chance(0.28);
    let work_life_balance = 1 + rng.weighted(&[0.05, 0.23, 0.61, 0.11]) as i64;
    let distance_from_home = 1 + (rng.next_f64() * 29.0) as i64;

    let mut p_leave = 0.08;
    if over_time {
        p_leave += 0.18;
    }
    if age < 30 {
        p_leave += 0.10;
    }
    if work_life_balance == 1 {
        p_leave += 0.10;
    }
    if job_level == 1 {
        p_leave += 0.06;
    }

    Employee {
        employee_number,
        age,
        attrition: if rng.chance(p_leave) { "Yes" } else { "No" },
        department,
        distance_from_home,
        job_level,
        job_role,
        monthly_income,
        over_time: if over_time { "Yes" } else { "No" },
        total_working_years,
        work_life_balance,
        years_at_company,
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    for i in 0..args.rows {
        writer
            .serialize(generate(&mut rng, i + 1))
            .with_context(|| format!("writing row {i}"))?;
    }
    writer.flush().context("flushing output")?;

    log::info!("Wrote {} employees to {}", args.rows, args.output.display());
    println!("Wrote {} employees to {}", args.rows, args.output.display());
    Ok(())
}
