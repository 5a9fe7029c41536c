//! PubMed Central: article page meta tags, `citation_pdf_url` for the PDF.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use super::html::{
    CITATION_KEYS, MetaTags, absolutize_url, compile_static_regex, metadata_from_meta,
};
use super::{
    HTML_ACCEPT, PdfLocation, ProviderContext, ProviderKind, fetch_landing_page, fetch_page,
    join_base,
};
use crate::error::PipelineError;
use crate::metadata::PaperMetadata;
use crate::reference::Reference;

const KIND: ProviderKind = ProviderKind::LifeSciencesRepository;

static PMCID_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?i)/articles/(PMC\d{4,})\b"));

pub(super) fn matches_path(url: &Url) -> bool {
    pmcid_from_url(url).is_some()
}

/// PMCID (uppercased) from an `/articles/PMC…` path.
pub(super) fn pmcid_from_url(url: &Url) -> Option<String> {
    PMCID_RE
        .captures(url.path())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_uppercase())
}

fn require_pmcid(reference: &Reference) -> Result<String, PipelineError> {
    reference
        .web_url()
        .and_then(pmcid_from_url)
        .ok_or_else(|| {
            PipelineError::extraction(KIND, reference.as_str(), "no PMCID in reference URL")
        })
}

fn article_url(ctx: &ProviderContext<'_>, pmcid: &str) -> String {
    join_base(&ctx.endpoints.pmc, &format!("articles/{pmcid}/"))
}

pub(super) async fn extract(
    ctx: &ProviderContext<'_>,
    reference: &Reference,
) -> Result<PaperMetadata, PipelineError> {
    let pmcid = require_pmcid(reference)?;
    let page = fetch_landing_page(ctx, KIND, reference, &article_url(ctx, &pmcid), HTML_ACCEPT)
        .await?;

    let tags = MetaTags::parse(&page.body);
    if tags.is_empty() {
        return Err(PipelineError::extraction(
            KIND,
            reference.as_str(),
            "article page has no meta tags",
        ));
    }

    // A redirect to another article shows up as a different PMCID here.
    let identifier = pmcid_from_url(&page.final_url).or(Some(pmcid));
    Ok(metadata_from_meta(&tags, &CITATION_KEYS).with_identifier(identifier))
}

pub(super) async fn locate(
    ctx: &ProviderContext<'_>,
    reference: &Reference,
) -> Result<PdfLocation, PipelineError> {
    let pmcid = require_pmcid(reference)?;
    let fallback = join_base(&ctx.endpoints.pmc, &format!("articles/{pmcid}/pdf/"));

    let url = match fetch_page(ctx, &article_url(ctx, &pmcid), HTML_ACCEPT).await {
        Ok(page) => MetaTags::parse(&page.body)
            .first(&["citation_pdf_url"])
            .and_then(|value| absolutize_url(&value, &page.final_url))
            .unwrap_or_else(|| {
                debug!(pmcid = %pmcid, "No citation_pdf_url; using /pdf/ path");
                fallback
            }),
        Err(exhausted) => {
            warn!(pmcid = %pmcid, error = %exhausted.last, "Article page unavailable; using /pdf/ path");
            fallback
        }
    };

    Ok(PdfLocation::remote(url, Some(pmcid)))
}
