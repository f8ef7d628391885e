//! Human-readable terminal renderer.

use std::path::Path;

use owo_colors::OwoColorize as _;

use crate::application::services::migrate::MigrationReport;
use crate::application::services::restore::RestoreReport;
use crate::domain::{Application, MigraConfig, Snapshot};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if !self.ctx.quiet {
            println!("migra {version}");
        }
    }

    /// Render the current configuration.
    pub fn render_config(&self, config: &MigraConfig, path: &Path) {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        let rows = [
            ("project", config.project.clone()),
            ("domain", config.domain.clone()),
            ("interface", config.interface.clone()),
            (
                "router",
                config
                    .router
                    .clone()
                    .unwrap_or_else(|| "(first router of the project)".to_string()),
            ),
            ("flavor", config.flavor.clone()),
            ("security_group", config.security_group.clone()),
            ("image_timeout_secs", config.image_timeout_secs.to_string()),
            ("server_timeout_secs", config.server_timeout_secs.to_string()),
            ("poll_interval_ms", config.poll_interval_ms.to_string()),
            ("concurrency", config.concurrency.to_string()),
            ("rollback", config.rollback.to_string()),
            (
                "work_dir",
                config.work_dir.as_ref().map_or_else(
                    || "(system temp dir)".to_string(),
                    |dir| dir.display().to_string(),
                ),
            ),
        ];
        for (key, value) in rows {
            println!("  {:<20} {value}", format!("{key}:"));
        }
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in ["MIGRA_CONFIG", "MIGRA_SRC", "MIGRA_DST", "MIGRA_USER", "NO_COLOR"] {
            println!(
                "    {:<18} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
        let password = if std::env::var("MIGRA_PASS").is_ok() {
            "(set)"
        } else {
            "(not set)"
        };
        println!("    {:<18} {password}", "MIGRA_PASS:");
        println!();
    }

    /// Render a saved setting.
    pub fn render_config_set(&self, key: &str, value: &str) {
        self.ctx.success(&format!("Set {key} = {value}"));
    }

    /// Render the applications of an installation.
    pub fn render_applications(&self, applications: &[Application]) {
        if applications.is_empty() {
            if !self.ctx.quiet {
                println!("No applications found.");
            }
            return;
        }
        for app in applications {
            println!(
                "  {:<16} {:<18} {}",
                app.name,
                app.plan.cidr,
                format_services(app.services.len())
            );
        }
    }

    /// Render the topology of one application.
    pub fn render_application(&self, app: &Application) {
        self.ctx.header(&format!("Application {}", app.name));
        self.ctx.kv("network: ", &app.network_id);
        self.ctx.kv("subnet:  ", &app.subnet_id);
        self.ctx.kv("cidr:    ", &app.plan.cidr);
        if !app.plan.dns_servers.is_empty() {
            self.ctx.kv("dns:     ", &app.plan.dns_servers.join(", "));
        }
        if self.ctx.quiet {
            return;
        }
        println!();
        for service in &app.services {
            println!(
                "    {:<14} {:<16} {}",
                service.name,
                service.fixed_ip.to_string(),
                format!("server {}", service.server_id).style(self.ctx.styles.dim)
            );
        }
    }

    /// Render a snapshot kept on local disk.
    pub fn render_snapshot(&self, snapshot: &Snapshot) {
        self.ctx.success(&format!(
            "Snapshot of '{}' saved to {}",
            snapshot.application.name,
            snapshot.directory.display()
        ));
        for item in &snapshot.items {
            self.ctx.kv(
                &format!("  {:<14}", item.service.name),
                &format!(
                    "{} {}/{}",
                    format_size(item.size_bytes),
                    item.disk_format,
                    item.container_format
                ),
            );
        }
    }

    /// Render the outcome of a restore.
    pub fn render_restore(&self, report: &RestoreReport) {
        self.ctx.success(&format!(
            "Restored '{}' ({})",
            report.application,
            format_services(report.services.len())
        ));
        for service in &report.services {
            let state = if service.active { "active" } else { "booting" };
            self.ctx.kv(
                &format!("  {:<14}", service.name),
                &format!("{:<16} {state}", service.fixed_ip.to_string()),
            );
        }
        let warnings = report.warning_count();
        if warnings > 0 {
            self.ctx.warn(&format!(
                "{warnings} warning{}",
                if warnings == 1 { "" } else { "s" }
            ));
        }
    }

    /// Render the outcome of a migration.
    pub fn render_migration(&self, report: &MigrationReport) {
        self.render_restore(&report.restore);
        if let Some(dir) = &report.snapshot_dir {
            self.ctx.info(&format!("Snapshot kept in {}", dir.display()));
        }
        if report.source_removed {
            self.ctx.success("Removed from the source installation");
        }
    }

    /// Render a completed removal.
    pub fn render_removed(&self, application: &str) {
        self.ctx
            .success(&format!("Removed application '{application}'"));
    }
}

// ── Display helpers ──────────────────────────────────────────────────────────

#[must_use]
pub fn format_services(count: usize) -> String {
    let noun = if count == 1 { "service" } else { "services" };
    format!("{count} {noun}")
}

/// Binary-prefixed size with one decimal, e.g. `1.5 GiB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
