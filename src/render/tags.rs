//! SEO and social head tags for an article.

use std::fmt::Write as _;

use serde_json::{json, Map, Value};

use crate::config::SiteConfig;
use crate::render::escape::{escape_html, escape_json_for_script};
use crate::render::metadata::ArticleMetadata;

/// The rendered head fragment for one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadTags(String);

impl HeadTags {
    pub fn build(article: &ArticleMetadata, site: &SiteConfig) -> Self {
        let title = format!("{} | {}", article.title, site.name);
        let description = article
            .excerpt
            .as_deref()
            .unwrap_or(&site.default_description);
        let canonical = format!("{}{}", site.base_url.trim_end_matches('/'), article.canonical_path);
        let image = article.image_url.as_deref().unwrap_or(&site.default_image);

        let mut out = String::with_capacity(2048);
        push_line(&mut out, format_args!("<title>{}</title>", escape_html(&title)));
        meta_name(&mut out, "description", description);
        push_line(
            &mut out,
            format_args!("<link rel=\"canonical\" href=\"{}\">", escape_html(&canonical)),
        );

        meta_property(&mut out, "og:type", "article");
        meta_property(&mut out, "og:site_name", &site.name);
        meta_property(&mut out, "og:locale", &site.locale);
        meta_property(&mut out, "og:title", &article.title);
        meta_property(&mut out, "og:description", description);
        meta_property(&mut out, "og:url", &canonical);
        meta_property(&mut out, "og:image", image);
        if let Some(published) = &article.published_at {
            meta_property(&mut out, "article:published_time", published);
        }
        if let Some(modified) = &article.modified_at {
            meta_property(&mut out, "article:modified_time", modified);
        }
        if let Some(section) = &article.section_name {
            meta_property(&mut out, "article:section", section);
        }
        if let Some(author) = &article.author_name {
            meta_property(&mut out, "article:author", author);
        }

        meta_name(&mut out, "twitter:card", "summary_large_image");
        if let Some(handle) = &site.twitter_handle {
            meta_name(&mut out, "twitter:site", handle);
        }
        meta_name(&mut out, "twitter:title", &article.title);
        meta_name(&mut out, "twitter:description", description);
        meta_name(&mut out, "twitter:image", image);

        let ld = structured_data(article, site, description, &canonical, image);
        push_line(
            &mut out,
            format_args!(
                "<script type=\"application/ld+json\">{}</script>",
                escape_json_for_script(&ld.to_string())
            ),
        );

        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn push_line(out: &mut String, line: std::fmt::Arguments<'_>) {
    let _ = out.write_fmt(line);
    out.push('\n');
}

fn meta_name(out: &mut String, name: &str, content: &str) {
    push_line(
        out,
        format_args!("<meta name=\"{}\" content=\"{}\">", name, escape_html(content)),
    );
}

fn meta_property(out: &mut String, property: &str, content: &str) {
    push_line(
        out,
        format_args!("<meta property=\"{}\" content=\"{}\">", property, escape_html(content)),
    );
}

/// schema.org `NewsArticle`; absent fields are omitted.
fn structured_data(
    article: &ArticleMetadata,
    site: &SiteConfig,
    description: &str,
    canonical: &str,
    image: &str,
) -> Value {
    let mut ld = Map::new();
    ld.insert("@context".into(), json!("https://schema.org"));
    ld.insert("@type".into(), json!("NewsArticle"));
    ld.insert("headline".into(), json!(article.title));
    ld.insert("description".into(), json!(description));
    ld.insert("image".into(), json!([image]));
    ld.insert(
        "mainEntityOfPage".into(),
        json!({ "@type": "WebPage", "@id": canonical }),
    );
    if let Some(published) = &article.published_at {
        ld.insert("datePublished".into(), json!(published));
    }
    if let Some(modified) = &article.modified_at {
        ld.insert("dateModified".into(), json!(modified));
    }
    if let Some(section) = &article.section_name {
        ld.insert("articleSection".into(), json!(section));
    }
    if let Some(author) = &article.author_name {
        ld.insert("author".into(), json!({ "@type": "Person", "name": author }));
    }

    let mut publisher = Map::new();
    publisher.insert("@type".into(), json!("Organization"));
    publisher.insert("name".into(), json!(site.name));
    if let Some(logo) = &site.publisher_logo {
        publisher.insert("logo".into(), json!({ "@type": "ImageObject", "url": logo }));
    }
    ld.insert("publisher".into(), Value::Object(publisher));

    Value::Object(ld)
}
