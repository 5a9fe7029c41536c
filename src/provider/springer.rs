//! Springer Link: article/chapter meta tags, `/content/pdf/<doi>.pdf` fallback.

use tracing::{debug, warn};
use url::Url;

use super::html::{CITATION_KEYS, MetaTags, absolutize_url, find_doi, metadata_from_meta};
use super::{
    HTML_ACCEPT, PdfLocation, ProviderContext, ProviderKind, fetch_landing_page, fetch_page,
    join_base,
};
use crate::error::PipelineError;
use crate::metadata::PaperMetadata;
use crate::reference::{Reference, strip_pdf_extension};

const KIND: ProviderKind = ProviderKind::PublisherSite;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SpringerRef {
    /// `article` or `chapter`.
    section: &'static str,
    doi: String,
}

pub(super) fn matches_path(url: &Url) -> bool {
    parse_springer_url(url).is_some()
}

fn parse_springer_url(url: &Url) -> Option<SpringerRef> {
    let path = url.path();
    let (section, rest) = if let Some(rest) = path.strip_prefix("/article/") {
        ("article", rest)
    } else if let Some(rest) = path.strip_prefix("/chapter/") {
        ("chapter", rest)
    } else if let Some(rest) = path.strip_prefix("/content/pdf/") {
        ("article", strip_pdf_extension(rest))
    } else {
        return None;
    };

    let decoded = urlencoding::decode(rest).map_or_else(|_| rest.to_string(), |d| d.into_owned());
    find_doi(&decoded).map(|doi| SpringerRef { section, doi })
}

fn require_ref(reference: &Reference) -> Result<SpringerRef, PipelineError> {
    reference
        .web_url()
        .and_then(parse_springer_url)
        .ok_or_else(|| {
            PipelineError::extraction(KIND, reference.as_str(), "no DOI in Springer URL")
        })
}

fn landing_url(ctx: &ProviderContext<'_>, springer_ref: &SpringerRef) -> String {
    join_base(
        &ctx.endpoints.springer,
        &format!("{}/{}", springer_ref.section, springer_ref.doi),
    )
}

pub(super) async fn extract(
    ctx: &ProviderContext<'_>,
    reference: &Reference,
) -> Result<PaperMetadata, PipelineError> {
    let springer_ref = require_ref(reference)?;
    let page = fetch_landing_page(
        ctx,
        KIND,
        reference,
        &landing_url(ctx, &springer_ref),
        HTML_ACCEPT,
    )
    .await?;
    let tags = MetaTags::parse(&page.body);

    let identifier = tags
        .first_by_priority(&["citation_doi", "dc.identifier"])
        .and_then(|value| find_doi(&value))
        .unwrap_or(springer_ref.doi);
    Ok(metadata_from_meta(&tags, &CITATION_KEYS).with_identifier(Some(identifier)))
}

pub(super) async fn locate(
    ctx: &ProviderContext<'_>,
    reference: &Reference,
) -> Result<PdfLocation, PipelineError> {
    let springer_ref = require_ref(reference)?;
    let fallback = join_base(
        &ctx.endpoints.springer,
        &format!("content/pdf/{}.pdf", springer_ref.doi),
    );

    let url = match fetch_page(ctx, &landing_url(ctx, &springer_ref), HTML_ACCEPT).await {
        Ok(page) => MetaTags::parse(&page.body)
            .first(&["citation_pdf_url"])
            .and_then(|value| absolutize_url(&value, &page.final_url))
            .unwrap_or_else(|| {
                debug!(doi = %springer_ref.doi, "No citation_pdf_url; using /content/pdf/ path");
                fallback
            }),
        Err(exhausted) => {
            warn!(doi = %springer_ref.doi, error = %exhausted.last, "Springer page unavailable; using /content/pdf/ path");
            fallback
        }
    };

    Ok(PdfLocation::remote(url, Some(springer_ref.doi)))
}
