//! Console output of a run.
use crate::controller::RunReport;
use orderload_core::{RunConfig, StatsSnapshot, TOP_ERROR_COUNT};
use std::fmt;
use std::time::{Duration, SystemTime};

const RULE_WIDTH: usize = 60;

fn rule(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", "=".repeat(RULE_WIDTH))
}

pub(crate) struct Banner<'a>(pub &'a RunConfig);

impl fmt::Display for Banner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.0;
        rule(f)?;
        writeln!(f, "Starting load test: {}", config.test_type)?;
        writeln!(f, "Target URL:  {}", config.base_url)?;
        writeln!(f, "Workers:     {}", config.workers)?;
        writeln!(
            f,
            "Duration:    {}",
            humantime::format_duration(config.duration)
        )?;
        writeln!(
            f,
            "Ramp-up:     {}",
            humantime::format_duration(config.ramp_up)
        )?;
        write!(f, "{}", "=".repeat(RULE_WIDTH))
    }
}

pub(crate) struct ProgressLine<'a> {
    pub at: SystemTime,
    pub snapshot: &'a StatsSnapshot,
}

impl fmt::Display for ProgressLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.snapshot;
        write!(
            f,
            "[{}] total: {}, success: {}, failed: {}, success rate: {:.2}%, avg: {:.2}ms, P95: {:.2}ms",
            humantime::format_rfc3339_seconds(self.at),
            s.total,
            s.success,
            s.failed,
            s.success_rate(),
            s.latency.avg,
            s.latency.p95,
        )
    }
}

pub(crate) struct FinalReport<'a>(pub &'a RunReport);

impl fmt::Display for FinalReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let s = &report.snapshot;

        rule(f)?;
        if report.interrupted {
            writeln!(f, "Load test interrupted - final statistics")?;
        } else {
            writeln!(f, "Load test finished - final statistics")?;
        }
        rule(f)?;
        writeln!(f, "Total requests:  {}", s.total)?;
        writeln!(f, "Successful:      {}", s.success)?;
        writeln!(f, "Failed:          {}", s.failed)?;
        writeln!(f, "Success rate:    {:.2}%", s.success_rate())?;
        writeln!(
            f,
            "Elapsed:         {}",
            humantime::format_duration(round_to_millis(report.elapsed))
        )?;
        writeln!(f, "Throughput:      {:.2} req/s", s.throughput(report.elapsed))?;

        writeln!(f)?;
        writeln!(f, "Latency (ms):")?;
        writeln!(f, "  avg: {:.2}", s.latency.avg)?;
        writeln!(f, "  min: {:.2}", s.latency.min)?;
        writeln!(f, "  max: {:.2}", s.latency.max)?;
        writeln!(f, "  P50: {:.2}", s.latency.p50)?;
        writeln!(f, "  P95: {:.2}", s.latency.p95)?;
        writeln!(f, "  P99: {:.2}", s.latency.p99)?;

        let codes = s.status_codes_sorted();
        if !codes.is_empty() {
            writeln!(f)?;
            writeln!(f, "HTTP status codes:")?;
            for (code, count) in codes {
                writeln!(f, "  {code}: {count}")?;
            }
        }

        let errors = s.top_errors(TOP_ERROR_COUNT);
        if !errors.is_empty() {
            writeln!(f)?;
            writeln!(f, "Errors (top {TOP_ERROR_COUNT}):")?;
            for (label, count) in errors {
                writeln!(f, "  {label}: {count}")?;
            }
        }

        write!(f, "{}", "=".repeat(RULE_WIDTH))
    }
}

fn round_to_millis(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis() as u64)
}
