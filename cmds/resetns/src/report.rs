//! Operator-facing summary of a recovery.

use std::{fmt, io::Write};

use chrono::{DateTime, SecondsFormat};
use clap::ValueEnum;
use k8s_proto::{core::Namespace, meta::Time};
use serde::Serialize;

use crate::config::RecoverTarget;

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
	#[default]
	Text,
	Json,
}

impl fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryReport {
	pub name: String,
	pub key: String,
	pub uid: Option<String>,
	/// Phase stored before the edit.
	pub previous_phase: Option<String>,
	/// When deletion was requested, RFC 3339.
	pub deletion_requested_at: Option<String>,
	pub removed_conditions: usize,
	/// Revision of the record that was read.
	pub read_revision: i64,
	/// Revision the write landed at. Absent on a dry run.
	pub written_revision: Option<i64>,
	pub dry_run: bool,
}

impl RecoveryReport {
	pub(crate) fn new(target: &RecoverTarget, original: &Namespace, read_revision: i64) -> Self {
		let meta = original.metadata.as_ref();
		Self {
			name: target.name().to_string(),
			key: target.key(),
			uid: meta.and_then(|m| m.uid.clone()).filter(|uid| !uid.is_empty()),
			previous_phase: original.phase_str().map(str::to_string),
			deletion_requested_at: meta
				.and_then(|m| m.deletion_timestamp.as_ref())
				.map(format_time),
			removed_conditions: original
				.status
				.as_ref()
				.map_or(0, |status| status.conditions.len()),
			read_revision,
			written_revision: None,
			dry_run: false,
		}
	}

	pub fn render<W: Write>(&self, format: OutputFormat, mut writer: W) -> anyhow::Result<()> {
		match format {
			OutputFormat::Json => {
				serde_json::to_writer_pretty(&mut writer, self)?;
				writeln!(writer)?;
			}
			OutputFormat::Text => self.render_text(&mut writer)?,
		}
		Ok(())
	}

	fn render_text<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
		if self.dry_run {
			writeln!(
				writer,
				"namespace [{}] would be reset to Active (dry run, nothing written)",
				self.name
			)?;
		} else {
			writeln!(writer, "namespace [{}] reset to Active", self.name)?;
		}
		writeln!(writer, "  key:                {}", self.key)?;
		if let Some(uid) = &self.uid {
			writeln!(writer, "  uid:                {uid}")?;
		}
		writeln!(
			writer,
			"  previous phase:     {}",
			self.previous_phase.as_deref().unwrap_or("<unset>")
		)?;
		if let Some(at) = &self.deletion_requested_at {
			writeln!(writer, "  deletion requested: {at}")?;
		}
		writeln!(writer, "  conditions removed: {}", self.removed_conditions)?;
		match self.written_revision {
			Some(written) => writeln!(
				writer,
				"  revision:           {} -> {}",
				self.read_revision, written
			)?,
			None => writeln!(writer, "  revision:           {}", self.read_revision)?,
		}
		Ok(())
	}
}

fn format_time(time: &Time) -> String {
	let seconds = time.seconds.unwrap_or_default();
	let nanos = time.nanos.and_then(|n| u32::try_from(n).ok()).unwrap_or(0);
	match DateTime::from_timestamp(seconds, nanos) {
		Some(at) => at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
		None => format!("{seconds}s since epoch"),
	}
}
