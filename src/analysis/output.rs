use crate::prelude::*;
use std::collections::HashMap;
use std::io::Write;

pub mod prelude {
    pub use super::Summary;
}

/// Write the per-job completion and response intervals as CSV.
///
/// Responses pair endpoints with the matching arrival bound: best case
/// against the earliest arrival, worst case against the latest. A job the
/// exploration never dispatched is emitted as `-1,-1,-1,-1`.
pub fn write_response_times<W: Write>(
    jobs: &JobSet,
    completions: &HashMap<JobId, Interval<Time>>,
    mut writer: W,
) -> std::io::Result<()> {
    writeln!(writer, "Task ID,Job ID,BCCT,WCCT,BCRT,WCRT")?;

    for job in jobs.iter() {
        let id = job.id();
        match completions.get(&id) {
            None => writeln!(writer, "{},{},-1,-1,-1,-1", id.task, id.job)?,
            Some(completion) => writeln!(
                writer,
                "{},{},{},{},{},{}",
                id.task,
                id.job,
                completion.from(),
                completion.until(),
                completion.from() - job.earliest_arrival(),
                completion.until() - job.latest_arrival(),
            )?,
        }
    }

    Ok(())
}

/// One-row account of an analysis run.
#[derive(Clone)]
#[derive(Debug)]
pub struct Summary {
    pub output_file: String,
    pub schedulable: bool,
    pub num_states: u64,
    pub cpu_seconds: f64,
    pub memory_mib: f64,
    pub timed_out: bool,
    pub num_groups: usize,
}

impl Summary {
    const HEADERS: [&'static str; 7] = [
        "Output file",
        "Schedulable?",
        "#States",
        "CPU time(s)",
        "Memory (MiB)",
        "Timeout?",
        "#Groups",
    ];

    fn values(&self) -> [String; 7] {
        [
            self.output_file.clone(),
            yes_no(self.schedulable).to_owned(),
            self.num_states.to_string(),
            format!("{:.6}", self.cpu_seconds),
            format!("{:.3}", self.memory_mib),
            yes_no(self.timed_out).to_owned(),
            self.num_groups.to_string(),
        ]
    }

    /// The comma-separated form used by `--raw`.
    pub fn raw(&self) -> String {
        self.values().join(",  ")
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values = self.values();
        let widths: Vec<usize> = Self::HEADERS
            .iter()
            .zip(&values)
            .map(|(header, value)| usize::max(header.len(), value.len()) + 2)
            .collect();

        let mut rule = String::new();
        for width in &widths {
            rule.push('+');
            rule.push_str(&"-".repeat(*width));
        }
        rule.push('+');

        let render_row = |cells: &[&str]| {
            let mut row = String::new();
            for (cell, width) in cells.iter().zip(&widths) {
                row.push_str(&format!("| {cell:<pad$}", pad = width - 1));
            }
            row.push('|');
            row
        };

        let headers = render_row(&Self::HEADERS);
        let cells: Vec<&str> = values.iter().map(String::as_str).collect();
        let row = render_row(&cells);

        writeln!(f, "{rule}")?;
        writeln!(f, "{headers}")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "{row}")?;
        writeln!(f, "{rule}")
    }
}

/// Peak resident set size of this process, in MiB. Reads `VmHWM` from
/// procfs; platforms without it report zero.
pub fn peak_memory_mib() -> f64 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if let Some(rest) = line.strip_prefix("VmHWM:") {
                    let kib: f64 = rest
                        .trim()
                        .trim_end_matches("kB")
                        .trim()
                        .parse()
                        .unwrap_or(0.0);
                    return kib / 1024.0;
                }
            }
        }
    }
    0.0
}

// =============================================================================

#[cfg(test)]
fn output_fixture() -> (JobSet, HashMap<JobId, Interval<Time>>) {
    let job = |task, arrival: (i64, i64), deadline| {
        Job::new(
            format!("T{task},0"),
            JobId { task, job: 0 },
            Interval::new(Time::ticks(arrival.0), Time::ticks(arrival.1)),
            Interval::new(Time::ticks(1), Time::ticks(2)),
            Time::ticks(deadline),
            0,
            Time::zero(),
            Time::zero(),
        )
    };
    let jobs = JobSet::new(vec![job(1, (0, 0), 10), job(2, (2, 4), 20)]).unwrap();

    let mut completions = HashMap::new();
    completions.insert(
        JobId { task: 1, job: 0 },
        Interval::new(Time::ticks(3), Time::ticks(5)),
    );
    (jobs, completions)
}

#[test]
fn csv_rows_pair_completions_with_arrival_bounds() {
    let (jobs, completions) = output_fixture();

    let mut rendered = Vec::new();
    write_response_times(&jobs, &completions, &mut rendered).unwrap();
    let rendered = String::from_utf8(rendered).unwrap();

    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines[0], "Task ID,Job ID,BCCT,WCCT,BCRT,WCRT");
    assert_eq!(lines[1], "1,0,3,5,3,5");
    assert_eq!(lines[2], "2,0,-1,-1,-1,-1");
    assert_eq!(lines.len(), 3);
}

#[test]
fn csv_goes_through_a_real_file() {
    let (jobs, completions) = output_fixture();

    let file = tempfile::NamedTempFile::new().unwrap();
    write_response_times(&jobs, &completions, file.as_file()).unwrap();

    let written = std::fs::read_to_string(file.path()).unwrap();
    assert!(written.contains("1,0,3,5,3,5"));
}

#[test]
fn raw_summary_is_one_comma_separated_row() {
    let summary = Summary {
        output_file: "out.csv".to_owned(),
        schedulable: true,
        num_states: 42,
        cpu_seconds: 0.25,
        memory_mib: 12.0,
        timed_out: false,
        num_groups: 2,
    };

    let raw = summary.raw();
    assert!(raw.starts_with("out.csv,  Yes,  42,  0.250000,  "));
    assert!(raw.ends_with("No,  2"));
}

#[test]
fn formatted_summary_is_a_bordered_table() {
    let summary = Summary {
        output_file: "out.csv".to_owned(),
        schedulable: false,
        num_states: 7,
        cpu_seconds: 1.5,
        memory_mib: 3.0,
        timed_out: true,
        num_groups: 1,
    };

    let rendered = summary.to_string();
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("+-"));
    assert!(lines[1].contains("| Output file "));
    assert!(lines[1].contains("| Schedulable? "));
    assert!(lines[3].contains("| No "));
    assert!(lines[3].contains("| Yes "));
    assert!(lines[3].contains("| 7 "));
}

#[test]
fn peak_memory_probe_does_not_fail() {
    assert!(peak_memory_mib() >= 0.0);
}
