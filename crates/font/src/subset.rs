//! The subset pipeline: codepoint assembly, backend invocation, and
//! assembly of the embeddable payload map.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use assfonts_ass::{CodepointSet, FontKey, FontSetMap};
use log::{info, warn};
use rayon::prelude::*;

use crate::db::{FaceLocation, FontDatabase};
use crate::{FontError, Result};

/// Callback deciding whether a per-entry failure is skipped (`true`) or
/// aborts the run (`false`). Report-only diagnostics also arrive here;
/// their return value is ignored.
pub type ErrorHook<'a> = &'a (dyn Fn(&FontError) -> bool + Sync);

/// Options for [`FontDatabase::subset`].
#[derive(Default, Clone, Copy)]
pub struct SubsetOptions<'a> {
    parallel: bool,
    check_coverage: bool,
    hook: Option<ErrorHook<'a>>,
}

impl<'a> SubsetOptions<'a> {
    pub fn new() -> SubsetOptions<'a> {
        SubsetOptions::default()
    }

    /// Subset each font on its own rayon task. Completion order does not
    /// affect the result.
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Report codepoints the matched face cannot render.
    pub fn check_coverage(mut self, enabled: bool) -> Self {
        self.check_coverage = enabled;
        self
    }

    /// Install the error callback.
    pub fn on_error(mut self, hook: ErrorHook<'a>) -> Self {
        self.hook = Some(hook);
        self
    }
}

/// One unit of subsetting work: a font key, the face it resolved to, and
/// the codepoints the subset must cover.
#[derive(Debug, Clone)]
pub struct SubsetRequest {
    pub key: FontKey,
    pub location: FaceLocation,
    pub codepoints: CodepointSet,
}

/// ASCII printables plus their fullwidth forms. Always subset in, so
/// common Latin punctuation and digits render even when the dialogue text
/// never contains them literally.
pub fn ancillary_codepoints() -> impl Iterator<Item = char> {
    ('\u{0020}'..='\u{007e}').chain('\u{ff01}'..='\u{ff5e}')
}

impl FontDatabase {
    /// Resolve every font key in `sets`, subset each matched face down to
    /// the codepoints it must render, and return the payloads keyed by
    /// embed filename (`<font name><source extension>`).
    ///
    /// Resolution failures abort immediately. Per-entry subsetting
    /// failures go through the error hook when one is installed; a `true`
    /// return drops the entry and processing continues.
    pub fn subset(
        &self,
        sets: &FontSetMap,
        options: &SubsetOptions,
    ) -> Result<BTreeMap<String, Vec<u8>>> {
        let requests = self.build_requests(sets)?;
        let results: Vec<Result<(String, Vec<u8>)>> = if options.parallel {
            requests
                .par_iter()
                .map(|request| self.subset_one(request, options))
                .collect()
        } else {
            requests
                .iter()
                .map(|request| self.subset_one(request, options))
                .collect()
        };

        let mut payloads = BTreeMap::new();
        for result in results {
            match result {
                Ok((name, data)) => {
                    payloads.insert(name, data);
                }
                Err(err) => match options.hook {
                    Some(hook) if hook(&err) => warn!("dropping subset entry: {err}"),
                    _ => return Err(err),
                },
            }
        }
        if payloads.is_empty() {
            return Err(FontError::EmptySubsetData);
        }
        Ok(payloads)
    }

    fn build_requests(&self, sets: &FontSetMap) -> Result<Vec<SubsetRequest>> {
        let mut requests = Vec::with_capacity(sets.len());
        for (key, set) in sets {
            let (location, score) = self.find_face(key)?;
            info!("{key} matched {location}, score {score}");
            let mut codepoints = set.clone();
            codepoints.extend(ancillary_codepoints());
            requests.push(SubsetRequest { key: key.clone(), location, codepoints });
        }
        Ok(requests)
    }

    fn subset_one(
        &self,
        request: &SubsetRequest,
        options: &SubsetOptions,
    ) -> Result<(String, Vec<u8>)> {
        let data = self.font_bytes(&request.location.path)?;
        if options.check_coverage {
            if let Some(gap) = self.coverage_gap(&data, request) {
                if let Some(hook) = options.hook {
                    hook(&gap);
                }
                warn!("{gap}");
            }
        }
        let subset = self
            .subsetter
            .subset(&data, request.location.index, &request.codepoints)
            .map_err(|reason| FontError::Subset {
                key: request.key.clone(),
                location: request.location.clone(),
                reason,
            })?;
        let extension = request
            .location
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        Ok((format!("{}{}", request.key.name, extension), subset))
    }

    /// Report-only check that the matched face carries a glyph for every
    /// requested codepoint.
    fn coverage_gap(&self, data: &[u8], request: &SubsetRequest) -> Option<FontError> {
        let missing: Vec<char> = request
            .codepoints
            .iter()
            .copied()
            .filter(|&cp| {
                !self
                    .parser
                    .has_glyph(data, request.location.index, cp)
                    .unwrap_or(false)
            })
            .collect();
        if missing.is_empty() {
            None
        } else {
            Some(FontError::CoverageGap {
                key: request.key.clone(),
                location: request.location.clone(),
                missing,
            })
        }
    }

    /// Font bytes for a path: from the big-memory cache when present,
    /// otherwise read on demand. The cache is never written here, so
    /// parallel tasks only share read access.
    fn font_bytes(&self, path: &Path) -> Result<Cow<'_, [u8]>> {
        if let Some(cached) = self.cache.get(path) {
            return Ok(Cow::Borrowed(cached.as_slice()));
        }
        fs::read(path)
            .map(Cow::Owned)
            .map_err(|source| FontError::FontIo { path: path.to_path_buf(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{mock_db, record};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sets(entries: &[(FontKey, &str)]) -> FontSetMap {
        entries
            .iter()
            .map(|(key, chars)| (key.clone(), chars.chars().collect()))
            .collect()
    }

    #[test]
    fn ancillary_set_covers_both_ascii_blocks() {
        let cps: Vec<char> = ancillary_codepoints().collect();
        assert_eq!(cps.len(), 189);
        assert!(cps.contains(&' '));
        assert!(cps.contains(&'~'));
        assert!(cps.contains(&'！'));
        assert!(cps.contains(&'～'));
    }

    #[test]
    fn subset_output_keyed_by_name_and_source_extension() {
        let mut db = mock_db();
        db.insert_face(record("/f/simsun.ttc", 0, &["宋体"], &[], 400, 0), vec![]);

        let map = sets(&[(FontKey::new("宋体", 700, 100), "体")]);
        let payloads = db.subset(&map, &SubsetOptions::new()).unwrap();
        assert_eq!(payloads.len(), 1);
        let data = payloads.get("宋体.ttc").expect("keyed by name + extension");
        // the mock echoes the requested codepoints: dialogue + ancillary
        let echoed = String::from_utf8(data.clone()).unwrap();
        assert!(echoed.contains('体'));
        assert!(echoed.contains('0'));
        assert!(echoed.contains('～'));
    }

    #[test]
    fn score_400_for_bold_italic_request_against_regular_face() {
        let mut db = mock_db();
        db.insert_face(record("/f/simsun.ttc", 0, &["宋体"], &[], 400, 0), vec![]);
        let (_, score) = db.find_face(&FontKey::new("宋体", 700, 100)).unwrap();
        assert_eq!(score, 400);
    }

    #[test]
    fn missing_face_aborts_before_subsetting() {
        let db = mock_db();
        let map = sets(&[(FontKey::new("无此字体", 400, 0), "字")]);
        assert!(matches!(
            db.subset(&map, &SubsetOptions::new()),
            Err(FontError::MissingFontFace { .. })
        ));
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let mut db = mock_db();
        db.insert_face(record("/f/a.ttf", 0, &["fonta"], &[], 400, 0), vec![]);
        db.insert_face(record("/f/b.ttf", 0, &["fontb"], &[], 400, 0), vec![]);
        db.insert_face(record("/f/c.otf", 0, &["fontc"], &[], 400, 0), vec![]);

        let map = sets(&[
            (FontKey::new("fonta", 400, 0), "甲乙"),
            (FontKey::new("fontb", 700, 0), "丙"),
            (FontKey::new("fontc", 400, 100), "丁"),
        ]);
        let sequential = db.subset(&map, &SubsetOptions::new()).unwrap();
        let parallel = db.subset(&map, &SubsetOptions::new().parallel(true)).unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(sequential.len(), 3);
    }

    #[test]
    fn coverage_gaps_are_reported_not_fatal() {
        let mut db = mock_db();
        db.insert_face(record("/f/a.ttf", 0, &["fonta"], &[], 400, 0), vec![]);

        let gaps = AtomicUsize::new(0);
        let hook = |err: &FontError| {
            if matches!(err, FontError::CoverageGap { .. }) {
                gaps.fetch_add(1, Ordering::Relaxed);
            }
            true
        };
        let map = sets(&[(FontKey::new("fonta", 400, 0), "有缺")]);
        let options = SubsetOptions::new().check_coverage(true).on_error(&hook);
        let payloads = db.subset(&map, &options).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(gaps.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn hook_downgrades_subset_failures() {
        struct FailingSubsetter;
        impl crate::backend::FontSubsetter for FailingSubsetter {
            fn subset(
                &self,
                _data: &[u8],
                _index: u32,
                cps: &CodepointSet,
            ) -> anyhow::Result<Vec<u8>> {
                if cps.contains(&'坏') {
                    anyhow::bail!("corrupt face");
                }
                Ok(vec![1])
            }
        }

        let mut db = crate::db::FontDatabase::with_backend(
            Box::new(crate::db::tests::MockParser),
            Box::new(FailingSubsetter),
        );
        db.insert_face(record("/f/good.ttf", 0, &["good"], &[], 400, 0), vec![]);
        db.insert_face(record("/f/bad.ttf", 0, &["bad"], &[], 400, 0), vec![]);

        let map = sets(&[
            (FontKey::new("good", 400, 0), "好"),
            (FontKey::new("bad", 400, 0), "坏"),
        ]);

        // without a hook the failure propagates
        assert!(matches!(
            db.subset(&map, &SubsetOptions::new()),
            Err(FontError::Subset { .. })
        ));

        // a continue-hook drops the failing entry
        let keep_going = |_: &FontError| true;
        let payloads = db
            .subset(&map, &SubsetOptions::new().on_error(&keep_going))
            .unwrap();
        assert_eq!(payloads.len(), 1);
        assert!(payloads.contains_key("good.ttf"));

        // an abort-hook propagates
        let stop = |_: &FontError| false;
        assert!(db
            .subset(&map, &SubsetOptions::new().on_error(&stop))
            .is_err());
    }

    #[test]
    fn all_entries_failing_is_empty_subset_data() {
        struct AlwaysFails;
        impl crate::backend::FontSubsetter for AlwaysFails {
            fn subset(
                &self,
                _data: &[u8],
                _index: u32,
                _cps: &CodepointSet,
            ) -> anyhow::Result<Vec<u8>> {
                anyhow::bail!("nope")
            }
        }
        let mut db = crate::db::FontDatabase::with_backend(
            Box::new(crate::db::tests::MockParser),
            Box::new(AlwaysFails),
        );
        db.insert_face(record("/f/a.ttf", 0, &["fonta"], &[], 400, 0), vec![]);
        let map = sets(&[(FontKey::new("fonta", 400, 0), "字")]);
        let keep_going = |_: &FontError| true;
        assert!(matches!(
            db.subset(&map, &SubsetOptions::new().on_error(&keep_going)),
            Err(FontError::EmptySubsetData)
        ));
    }

    #[test]
    fn colliding_names_overwrite() {
        let mut db = mock_db();
        db.insert_face(record("/f/one/dup.ttf", 0, &["dup"], &[], 400, 0), vec![]);
        let map = sets(&[
            (FontKey::new("dup", 400, 0), "甲"),
            (FontKey::new("dup", 700, 0), "乙"),
        ]);
        let payloads = db.subset(&map, &SubsetOptions::new()).unwrap();
        // both keys resolve to the same face and collide on "dup.ttf"
        assert_eq!(payloads.len(), 1);
        assert!(payloads.contains_key("dup.ttf"));
    }
}
