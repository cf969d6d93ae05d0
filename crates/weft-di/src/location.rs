//! Source locations attached to constructors for diagnostics

use std::fmt;

/// Where a constructor or invoked function was registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
	function: String,
	file: String,
	line: u32,
}

impl Location {
	pub fn new(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
		Self {
			function: function.into(),
			file: file.into(),
			line,
		}
	}

	/// Location of the caller of the enclosing `#[track_caller]` function.
	#[track_caller]
	pub fn caller(function: impl Into<String>) -> Self {
		Self::from_panic_location(function, std::panic::Location::caller())
	}

	pub(crate) fn from_panic_location(
		function: impl Into<String>,
		location: &std::panic::Location<'_>,
	) -> Self {
		Self::new(function, location.file(), location.line())
	}

	pub fn function(&self) -> &str {
		&self.function
	}

	pub fn file(&self) -> &str {
		&self.file
	}

	pub fn line(&self) -> u32 {
		self.line
	}
}

impl fmt::Display for Location {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({}:{})", self.function, self.file, self.line)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn caller_records_this_file() {
		// Act
		let location = Location::caller("app::new_db");

		// Assert
		assert_eq!(location.function(), "app::new_db");
		assert!(location.file().ends_with("location.rs"));
		assert!(location.line() > 0);
	}

	#[rstest]
	fn display_format() {
		let location = Location::new("app::new_db", "src/app.rs", 42);
		assert_eq!(location.to_string(), "app::new_db (src/app.rs:42)");
	}
}
