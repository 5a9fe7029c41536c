//! ACM Digital Library: `dc.*`/`citation_*` meta tags, `/doi/pdf/<doi>` fallback.

use tracing::{debug, warn};
use url::Url;

use super::html::{MetaKeys, MetaTags, absolutize_url, find_doi, metadata_from_meta};
use super::{
    HTML_ACCEPT, Page, PdfLocation, ProviderContext, ProviderKind, fetch_landing_page, fetch_page,
    join_base,
};
use crate::error::PipelineError;
use crate::metadata::PaperMetadata;
use crate::reference::Reference;

const KIND: ProviderKind = ProviderKind::DigitalLibrary;

const ACM_KEYS: MetaKeys = MetaKeys {
    title: &["dc.title", "citation_title"],
    authors: &["dc.creator", "citation_author"],
    date: &["dc.date", "citation_publication_date", "citation_date"],
};

/// How an ACM reference identifies its paper.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AcmRef {
    /// `/doi/<doi>` and its `abs`/`pdf`/`fullHtml` variants.
    Doi(String),
    /// Legacy `citation.cfm?id=<n>`.
    Legacy(String),
}

pub(super) fn matches_path(url: &Url) -> bool {
    parse_acm_url(url).is_some()
}

fn parse_acm_url(url: &Url) -> Option<AcmRef> {
    let path = url.path();
    if path.starts_with("/doi/") {
        return find_doi(path).map(AcmRef::Doi);
    }
    if path.eq_ignore_ascii_case("/citation.cfm") {
        return url
            .query_pairs()
            .find(|(key, _)| key == "id")
            .map(|(_, value)| value.trim().to_string())
            .filter(|id| !id.is_empty())
            .map(AcmRef::Legacy);
    }
    None
}

fn require_ref(reference: &Reference) -> Result<AcmRef, PipelineError> {
    reference
        .web_url()
        .and_then(parse_acm_url)
        .ok_or_else(|| {
            PipelineError::extraction(KIND, reference.as_str(), "not an ACM DOI or citation URL")
        })
}

fn landing_url(ctx: &ProviderContext<'_>, acm_ref: &AcmRef) -> String {
    match acm_ref {
        AcmRef::Doi(doi) => join_base(&ctx.endpoints.acm, &format!("doi/{doi}")),
        AcmRef::Legacy(id) => join_base(
            &ctx.endpoints.acm,
            &format!("citation.cfm?id={}", urlencoding::encode(id)),
        ),
    }
}

/// DOI the landing page says it describes.
fn page_doi(tags: &MetaTags, page: &Page) -> Option<String> {
    tags.first_by_priority(&["citation_doi", "dc.identifier"])
        .and_then(|value| find_doi(&value))
        .or_else(|| find_doi(page.final_url.path()))
}

pub(super) async fn extract(
    ctx: &ProviderContext<'_>,
    reference: &Reference,
) -> Result<PaperMetadata, PipelineError> {
    let acm_ref = require_ref(reference)?;
    let page =
        fetch_landing_page(ctx, KIND, reference, &landing_url(ctx, &acm_ref), HTML_ACCEPT).await?;
    let tags = MetaTags::parse(&page.body);

    let identifier = page_doi(&tags, &page).or(match acm_ref {
        AcmRef::Doi(doi) => Some(doi),
        AcmRef::Legacy(_) => None,
    });
    Ok(metadata_from_meta(&tags, &ACM_KEYS).with_identifier(identifier))
}

pub(super) async fn locate(
    ctx: &ProviderContext<'_>,
    reference: &Reference,
) -> Result<PdfLocation, PipelineError> {
    let acm_ref = require_ref(reference)?;
    let url_doi = match &acm_ref {
        AcmRef::Doi(doi) => Some(doi.clone()),
        AcmRef::Legacy(_) => None,
    };

    let (pdf_url, doi) = match fetch_page(ctx, &landing_url(ctx, &acm_ref), HTML_ACCEPT).await {
        Ok(page) => {
            let tags = MetaTags::parse(&page.body);
            let doi = url_doi.or_else(|| page_doi(&tags, &page));
            let pdf_url = tags
                .first(&["citation_pdf_url"])
                .and_then(|value| absolutize_url(&value, &page.final_url));
            (pdf_url, doi)
        }
        Err(exhausted) => {
            warn!(error = %exhausted.last, "ACM landing page unavailable");
            (None, url_doi)
        }
    };

    if let Some(url) = pdf_url {
        return Ok(PdfLocation::remote(url, doi));
    }

    let Some(doi) = doi else {
        return Err(PipelineError::extraction(
            KIND,
            reference.as_str(),
            "could not determine the DOI behind the legacy citation URL",
        ));
    };
    debug!(doi = %doi, "No citation_pdf_url; using /doi/pdf/ path");
    let url = join_base(&ctx.endpoints.acm, &format!("doi/pdf/{doi}"));
    Ok(PdfLocation::remote(url, Some(doi)))
}
