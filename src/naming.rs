//! Filename normalization and collision candidates.
//!
//! [`normalize`] is a pure function of [`PaperMetadata`]: identical metadata
//! always yields the identical [`CandidateFilename`], and the result only ever
//! contains `[A-Za-z0-9_-]` followed by `.pdf`.

use std::fmt;

use deunicode::deunicode_with_tofu;

use crate::metadata::{PaperMetadata, last_name};

/// Maximum number of authors named individually before switching to `et_al`.
pub const MAX_NAMED_AUTHORS: usize = 3;

/// Maximum length of a normalized stem, in bytes (the stem is pure ASCII).
pub const MAX_STEM_LEN: usize = 200;

/// Maximum number of filename candidates tried before giving up.
pub const MAX_COLLISION_ATTEMPTS: usize = 1000;

/// Extension appended to every normalized filename.
pub const PDF_EXTENSION: &str = ".pdf";

const UNKNOWN_AUTHORS: &str = "Unknown";
const UNTITLED: &str = "Untitled";

/// A filesystem-safe filename derived from metadata or a reference stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateFilename {
    stem: String,
}

impl CandidateFilename {
    /// Sanitizes an arbitrary stem; empty results fall back to `Untitled`.
    #[must_use]
    pub fn from_stem(raw: &str) -> Self {
        let stem = sanitize_stem(raw);
        if stem.is_empty() {
            Self {
                stem: UNTITLED.to_string(),
            }
        } else {
            Self { stem }
        }
    }

    /// Stem without extension.
    #[must_use]
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Full filename including `.pdf`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}{PDF_EXTENSION}", self.stem)
    }
}

impl fmt::Display for CandidateFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{PDF_EXTENSION}", self.stem)
    }
}

/// Builds the deterministic filename for `metadata`.
///
/// Layout: `<authors>_-_<title>_<year>.pdf`, where authors are up to
/// [`MAX_NAMED_AUTHORS`] last names joined with `_`, or the first last name
/// plus `_et_al` when there are more. Each part is sanitized on its own, so a
/// part that transliterates to nothing falls back to its placeholder.
#[must_use]
pub fn normalize(metadata: &PaperMetadata) -> CandidateFilename {
    let last_names: Vec<String> = metadata
        .authors
        .iter()
        .map(|name| sanitize_stem(&last_name(name)))
        .filter(|name| !name.is_empty())
        .collect();

    let authors = match last_names.len() {
        0 => UNKNOWN_AUTHORS.to_string(),
        n if n > MAX_NAMED_AUTHORS => format!("{}_et_al", last_names[0]),
        _ => last_names.join("_"),
    };
    let title = metadata
        .title
        .as_deref()
        .map(sanitize_stem)
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let mut raw = format!("{authors}_-_{title}");
    if let Some(year) = metadata.year {
        raw.push_str(&format!("_{year}"));
    }

    CandidateFilename::from_stem(&raw)
}

/// Transliterates to ASCII, replaces unsafe characters, collapses `_` runs
/// and trims. Never starts with `-`.
#[must_use]
pub fn sanitize_stem(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in deunicode_with_tofu(raw, "_").chars() {
        let c = if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            c
        } else {
            '_'
        };
        if !(c == '_' && out.ends_with('_')) {
            out.push(c);
        }
    }

    let trimmed = out.trim_start_matches(['_', '-']).trim_end_matches('_');
    let truncated = if trimmed.len() > MAX_STEM_LEN {
        // ASCII only, so any byte index is a char boundary.
        &trimmed[..MAX_STEM_LEN]
    } else {
        trimmed
    };
    truncated.trim_end_matches('_').to_string()
}

/// Candidate filenames for `file_name`, in the order they are tried.
///
/// For `S.ext` this yields `S.ext`, `S_.ext`, `S_2.ext`, `S_3.ext` and so on,
/// [`MAX_COLLISION_ATTEMPTS`] names in total.
pub fn collision_candidates(file_name: &str) -> impl Iterator<Item = String> + '_ {
    let (stem, extension) = split_extension(file_name);
    (0..MAX_COLLISION_ATTEMPTS).map(move |n| match n {
        0 => file_name.to_string(),
        1 => format!("{stem}_{extension}"),
        _ => format!("{stem}_{n}{extension}"),
    })
}

/// Splits `name` into stem and extension (with its dot); dotfiles have no extension.
#[must_use]
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Checks that an explicit filename is a single, non-special path segment.
#[must_use]
pub fn is_single_segment(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn is_safe(name: &str) -> bool {
        let Some(stem) = name.strip_suffix(".pdf") else {
            return false;
        };
        !stem.is_empty()
            && stem
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    #[test]
    fn test_normalize_three_authors_with_year() {
        let meta = PaperMetadata::from_raw(
            ["A. Burg", "V. Nazábal", "C. Sutton"],
            Some("Wrangling Messy CSV Files by Detecting Row and Type Patterns"),
            Some(2018),
        );
        assert_eq!(
            normalize(&meta).file_name(),
            "Burg_Nazabal_Sutton_-_Wrangling_Messy_CSV_Files_by_Detecting_Row_and_Type_Patterns_2018.pdf"
        );
    }

    #[test]
    fn test_normalize_more_than_three_authors_uses_et_al() {
        let meta = PaperMetadata::from_raw(
            ["Karol Gregor", "George Papamakarios", "Frederic Besse", "Lars Buesing"],
            Some("Temporal Difference Variational Auto-Encoder"),
            Some(2018),
        );
        assert_eq!(
            normalize(&meta).file_name(),
            "Gregor_et_al_-_Temporal_Difference_Variational_Auto-Encoder_2018.pdf"
        );
    }

    #[test]
    fn test_normalize_punctuation_collapses() {
        let meta = PaperMetadata::from_raw(
            ["Mary Beth Kery", "Amber Horvath", "Brad Myers"],
            Some("Variolite: Supporting Exploratory Programming by Data Scientists"),
            Some(2017),
        );
        assert_eq!(
            normalize(&meta).to_string(),
            "Kery_Horvath_Myers_-_Variolite_Supporting_Exploratory_Programming_by_Data_Scientists_2017.pdf"
        );
    }

    #[test]
    fn test_normalize_placeholders() {
        assert_eq!(
            normalize(&PaperMetadata::default()).file_name(),
            "Unknown_-_Untitled.pdf"
        );
        let meta = PaperMetadata::from_raw(["Plato"], None, None);
        assert_eq!(normalize(&meta).file_name(), "Plato_-_Untitled.pdf");
    }

    #[test]
    fn test_normalize_is_deterministic_and_safe() {
        let meta = PaperMetadata::from_raw(
            ["Łukasz Kaiser", "Ørjan Ødegård"],
            Some("¿Qué?  «Quoted» / slashes \\ and: colons…"),
            Some(2020),
        );
        let first = normalize(&meta);
        assert_eq!(first, normalize(&meta));
        let name = first.file_name();
        assert!(is_safe(&name), "{name}");
        assert!(name.starts_with("Kaiser_Odegard_-_"), "{name}");
        assert!(!name.contains("__"), "{name}");
    }

    #[test]
    fn test_normalize_transliterates_cyrillic() {
        let meta = PaperMetadata::from_raw(
            ["Иван Петров", "Ли Вэй"],
            Some("Нейронные сети"),
            Some(2020),
        );
        let name = normalize(&meta).file_name();
        assert!(is_safe(&name), "{name}");
        assert!(name.starts_with("Petrov_"), "{name}");
        assert!(name.contains("_-_"), "{name}");
        assert!(name.ends_with("_2020.pdf"), "{name}");
        assert!(!name.contains("Unknown") && !name.contains("Untitled"), "{name}");
    }

    #[test]
    fn test_normalize_transliterates_cjk_author() {
        let meta = PaperMetadata::from_raw(["张伟"], Some("Deep Learning"), Some(2021));
        let name = normalize(&meta).file_name();
        assert!(is_safe(&name), "{name}");
        assert!(name.starts_with("Zhang"), "{name}");
        assert!(name.ends_with("_-_Deep_Learning_2021.pdf"), "{name}");
    }

    #[test]
    fn test_normalize_parts_that_sanitize_to_nothing_use_placeholders() {
        let meta = PaperMetadata::from_raw(["***", "???"], Some("¡¿!?"), Some(2020));
        assert_eq!(normalize(&meta).file_name(), "Unknown_-_Untitled_2020.pdf");

        let meta = PaperMetadata::from_raw(["***", "Ada Lovelace"], Some("Notes"), None);
        assert_eq!(normalize(&meta).file_name(), "Lovelace_-_Notes.pdf");
    }

    #[test]
    fn test_sanitize_stem_never_starts_with_dash() {
        assert_eq!(sanitize_stem("--rf"), "rf");
        assert_eq!(sanitize_stem("_-a-b_"), "a-b");
    }

    #[test]
    fn test_normalize_truncates_long_titles() {
        let title = "word ".repeat(100);
        let meta = PaperMetadata::from_raw(["A. Author"], Some(&title), Some(1999));
        let candidate = normalize(&meta);
        assert!(candidate.stem().len() <= MAX_STEM_LEN);
        assert!(!candidate.stem().ends_with('_'));
        assert!(candidate.file_name().ends_with(".pdf"));
    }

    #[test]
    fn test_from_stem_empty_falls_back() {
        assert_eq!(CandidateFilename::from_stem("???").stem(), "Untitled");
        assert_eq!(CandidateFilename::from_stem("test").file_name(), "test.pdf");
    }

    #[test]
    fn test_collision_candidates_order() {
        let names: Vec<String> = collision_candidates("test.pdf").take(4).collect();
        assert_eq!(names, vec!["test.pdf", "test_.pdf", "test_2.pdf", "test_3.pdf"]);
        assert_eq!(collision_candidates("test.pdf").count(), MAX_COLLISION_ATTEMPTS);
    }

    #[test]
    fn test_collision_candidates_without_extension() {
        let names: Vec<String> = collision_candidates("README").take(3).collect();
        assert_eq!(names, vec!["README", "README_", "README_2"]);
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.b.pdf"), ("a.b", ".pdf"));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
        assert_eq!(split_extension("plain"), ("plain", ""));
    }

    #[test]
    fn test_is_single_segment() {
        assert!(is_single_segment("my paper.pdf"));
        assert!(!is_single_segment("../escape.pdf"));
        assert!(!is_single_segment("dir/file.pdf"));
        assert!(!is_single_segment(".."));
        assert!(!is_single_segment("  "));
    }
}
