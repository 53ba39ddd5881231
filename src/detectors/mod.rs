//! The banner-detection ensemble.
//!
//! Four interchangeable strategies, each appending zero or more banner
//! records under its own name. Detectors are independent: they may read
//! the DOM but never rewrite each other's results. Dispatch is data-driven
//! through [`DetectorKind`]; a detector-internal error is contained at the
//! `extract_information` boundary and the scan continues.

pub mod classifier;
pub mod clickable;
pub mod filter_list;
pub mod naive;
pub mod notice;
pub mod perceptive;

use chromiumoxide::Page;
use tracing::warn;

pub use crate::config::DetectorKind;
use crate::config::ScanOptions;
use crate::page::SharedPageLogs;
use crate::results::ScanResult;

use classifier::ClassifierDetector;
use filter_list::FilterListDetector;
use naive::NaiveDetector;
use perceptive::PerceptiveDetector;

/// The instantiated ensemble, in configuration order: filter lists first,
/// then naive, classifier, perceptive.
pub struct Detectors {
    filter_list: Option<FilterListDetector>,
    naive: Option<NaiveDetector>,
    classifier: Option<ClassifierDetector>,
    perceptive: Option<PerceptiveDetector>,
}

impl Detectors {
    pub fn from_options(options: &ScanOptions) -> Self {
        let toggles = options.detectors();
        let filter_list = if toggles.easylist_cookie || toggles.i_dont_care_about_cookies {
            match FilterListDetector::new(options) {
                Ok(detector) => Some(detector),
                Err(err) => {
                    warn!("Filter-list detector unavailable: {err}");
                    None
                }
            }
        } else {
            None
        };
        Self {
            filter_list,
            naive: toggles.naive.then(NaiveDetector::new),
            classifier: toggles.bert.then(ClassifierDetector::new),
            perceptive: toggles.perceptive.then(PerceptiveDetector::new),
        }
    }

    /// Only the preferred detector, for re-detection during click replay.
    pub fn single(options: &ScanOptions, kind: DetectorKind) -> Self {
        let mut detectors = Self {
            filter_list: None,
            naive: None,
            classifier: None,
            perceptive: None,
        };
        match kind {
            DetectorKind::EasylistCookie | DetectorKind::IDontCareAboutCookies => {
                match FilterListDetector::new(options) {
                    Ok(detector) => detectors.filter_list = Some(detector),
                    Err(err) => warn!("Filter-list detector unavailable: {err}"),
                }
            }
            DetectorKind::Naive => detectors.naive = Some(NaiveDetector::new()),
            DetectorKind::Bert => detectors.classifier = Some(ClassifierDetector::new()),
            DetectorKind::Perceptive => detectors.perceptive = Some(PerceptiveDetector::new()),
        }
        detectors
    }

    /// Run every instantiated detector, containing individual failures.
    pub async fn extract_information(
        &self,
        page: &Page,
        logs: &SharedPageLogs,
        result: &mut ScanResult,
        options: &ScanOptions,
    ) {
        if let Some(detector) = &self.filter_list
            && let Err(err) = detector
                .extract_information(page, logs, result, options)
                .await
        {
            warn!("filter-list detection failed: {err}");
        }
        if let Some(detector) = &self.naive
            && let Err(err) = detector
                .extract_information(page, logs, result, options)
                .await
        {
            warn!("naive detection failed: {err}");
        }
        if let Some(detector) = &self.classifier
            && let Err(err) = detector
                .extract_information(page, logs, result, options)
                .await
        {
            warn!("classifier detection failed: {err}");
        }
        if let Some(detector) = &self.perceptive
            && let Err(err) = detector
                .extract_information(page, logs, result, options)
                .await
        {
            warn!("perceptive detection failed: {err}");
        }
    }
}
