//! Shared UI icons.
//!
//! Each icon falls back to plain ASCII when the terminal cannot show emoji.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[FAIL] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[WARN] ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[INFO] ");

// Output sections
pub static EDITS: Emoji<'_, '_> = Emoji("📝 ", "~ ");
pub static RUN: Emoji<'_, '_> = Emoji("▶️  ", "> ");
pub static CAMERA: Emoji<'_, '_> = Emoji("📷 ", "");
