//! Interactive conflict confirmation on stdin.

use pubman_core::{AttributeKind, Conflict, ConflictResolver};
use std::io::{self, BufRead, Write};

/// Lists conflicting siblings and asks `[y/N]`; anything but `y`/`yes`
/// declines, including a closed stdin.
pub struct StdinResolver;

impl ConflictResolver for StdinResolver {
    fn confirm_clear(&mut self, kind: AttributeKind, conflicts: &[Conflict]) -> bool {
        println!(
            "{} sibling(s) already marked {}:",
            conflicts.len(),
            kind.badge()
        );
        for conflict in conflicts {
            println!("  {}  (since {})", conflict.name, conflict.first_marked);
        }
        print!("Clear {} on them and continue? [y/N] ", kind.badge());
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(_) => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::is_yes;

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("sure"));
    }
}
