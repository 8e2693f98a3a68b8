//! Building [`Page`] values from a collection's block graph.

use indexmap::IndexMap;
use tracing::{debug, info, instrument};

use blockpress_schema::{MetadataKind, is_truthy};
use blockpress_shared::{Block, BlockGraph, MetadataValue, Page, PropertyMapping};

use crate::cover::{ImageUrlMapper, SourceImageProxy};
use crate::dates::sort_newest_first;
use crate::frontmatter::{apply_frontmatter, parse_frontmatter, split_list};
use crate::hierarchy::{is_hierarchical, link_hierarchy};

/// Page type whose results are ordered by date.
const DATED_PAGE_TYPE: &str = "blog";

/// Per-collection extraction settings.
pub struct ExtractOptions<'a> {
    /// Page type used when the page has no type-select value.
    pub default_page_type: &'a str,
    /// Resolves cover references to loadable URLs.
    pub image_urls: &'a dyn ImageUrlMapper,
}

/// Extract every published page of the collection in `graph`.
///
/// Members come from all views, de-duplicated in first-seen order. Anything
/// that is not a page block with properties is skipped silently; a partial
/// result is normal. Inline frontmatter is applied before the published
/// filter. Blog collections come back newest first.
#[instrument(skip_all, fields(page_type = %options.default_page_type))]
pub fn extract_pages(
    graph: &BlockGraph,
    mapping: &PropertyMapping,
    options: &ExtractOptions<'_>,
) -> Vec<Page> {
    let members = graph.member_ids();
    let mut pages = Vec::with_capacity(members.len());

    for id in &members {
        let Some(block) = graph.block(id) else {
            debug!(id, "member block missing from graph");
            continue;
        };
        if !block.is_page() || block.properties.is_none() {
            debug!(id, kind = %block.kind, "member is not a page, skipping");
            continue;
        }

        let mut page = build_page(graph, id, block, mapping, options);
        if let Some(frontmatter) = parse_frontmatter(graph, block) {
            page = apply_frontmatter(&page, &frontmatter);
        }
        pages.push(page);
    }

    let extracted = pages.len();
    pages.retain(|p| p.published);

    if pages.iter().any(|p| is_hierarchical(&p.page_type)) {
        link_hierarchy(&mut pages);
    }
    if options.default_page_type == DATED_PAGE_TYPE {
        sort_newest_first(&mut pages);
    }

    info!(
        members = members.len(),
        extracted,
        published = pages.len(),
        "pages extracted"
    );
    pages
}

/// Extract with the source's default image proxy.
pub fn extract_pages_with_defaults(
    graph: &BlockGraph,
    mapping: &PropertyMapping,
    default_page_type: &str,
) -> Vec<Page> {
    let proxy = SourceImageProxy::default();
    extract_pages(
        graph,
        mapping,
        &ExtractOptions {
            default_page_type,
            image_urls: &proxy,
        },
    )
}

fn build_page(
    graph: &BlockGraph,
    id: &str,
    block: &Block,
    mapping: &PropertyMapping,
    options: &ExtractOptions<'_>,
) -> Page {
    let text = |key: &Option<String>| -> String {
        key.as_deref()
            .and_then(|k| block.property(k))
            .map(|v| v.plain_text().trim().to_string())
            .unwrap_or_default()
    };

    let page_type = Some(text(&mapping.type_key).to_lowercase())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| options.default_page_type.to_string());

    let slug = Some(text(&mapping.slug_key))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| id.to_string());

    // No mapped column means no token, so the page stays unpublished.
    let published = is_truthy(&text(&mapping.published_key));

    let date = mapping
        .date_key
        .as_deref()
        .and_then(|k| block.property(k))
        .map(|v| {
            v.date_annotation()
                .unwrap_or_else(|| v.plain_text().trim().to_string())
        })
        .unwrap_or_default();

    let cover_image = block
        .format
        .as_ref()
        .and_then(|f| f.page_cover.clone())
        .filter(|c| !c.trim().is_empty())
        .map(|raw| options.image_urls.map_url(&raw, block));

    let metadata = extract_metadata(block, &mapping.metadata_keys);
    let order = metadata.get("order").and_then(MetadataValue::as_number);

    // Only keep a structural parent that is itself a page in this graph.
    let parent = block
        .parent_id
        .as_deref()
        .filter(|p| graph.block(p).is_some_and(Block::is_page))
        .map(str::to_string);

    Page {
        id: id.to_string(),
        title: text(&mapping.title_key),
        slug,
        page_type,
        published,
        date,
        last_edited_time: block.last_edited_time,
        cover_image,
        description: Some(text(&mapping.description_key)).filter(|s| !s.is_empty()),
        author: Some(text(&mapping.author_key)).filter(|s| !s.is_empty()),
        metadata,
        frontmatter: None,
        parent,
        children: Vec::new(),
        order,
    }
}

fn extract_metadata(
    block: &Block,
    metadata_keys: &IndexMap<String, String>,
) -> IndexMap<String, MetadataValue> {
    let mut metadata = IndexMap::new();

    for (field, key) in metadata_keys {
        let raw = block
            .property(key)
            .map(|v| v.plain_text())
            .unwrap_or_default();
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let value = match MetadataKind::for_field(field) {
            MetadataKind::List => {
                let items = split_list(raw);
                if items.is_empty() {
                    continue;
                }
                MetadataValue::List(items)
            }
            MetadataKind::Order => MetadataValue::Number(raw.parse().unwrap_or(0)),
            MetadataKind::Boolean => MetadataValue::Bool(is_truthy(raw)),
            MetadataKind::Text => MetadataValue::Text(raw.to_string()),
        };
        metadata.insert(field.clone(), value);
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockpress_schema::map_schema;
    use blockpress_shared::{BlockFormat, PropertySchema, RichText, ViewQuery};
    use serde_json::json;

    fn schema() -> IndexMap<String, PropertySchema> {
        [
            ("title", "Name", "title"),
            ("slg", "Slug", "text"),
            ("pub", "Published", "checkbox"),
            ("dt", "Date", "date"),
            ("tg", "Tags", "multi_select"),
            ("ds", "Description", "text"),
        ]
        .into_iter()
        .map(|(k, n, t)| {
            (
                k.to_string(),
                PropertySchema {
                    name: n.into(),
                    kind: t.into(),
                },
            )
        })
        .collect()
    }

    fn page_block(id: &str, props: &[(&str, RichText)]) -> Block {
        Block {
            id: id.into(),
            kind: "page".into(),
            properties: Some(
                props
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            ),
            last_edited_time: 1_700_000_000_000,
            ..Default::default()
        }
    }

    fn graph(blocks: Vec<Block>, views: Vec<Vec<&str>>) -> BlockGraph {
        BlockGraph {
            blocks: blocks.into_iter().map(|b| (b.id.clone(), b)).collect(),
            schema: schema(),
            views: views
                .into_iter()
                .map(|ids| ViewQuery {
                    block_ids: ids.into_iter().map(String::from).collect(),
                })
                .collect(),
            signed_urls: IndexMap::new(),
        }
    }

    fn text(s: &str) -> RichText {
        RichText::from_text(s)
    }

    fn extract(graph: &BlockGraph, page_type: &str) -> Vec<Page> {
        let mapping = map_schema(&graph.schema, page_type, None, None);
        extract_pages_with_defaults(graph, &mapping, page_type)
    }

    #[test]
    fn blog_pages_sorted_newest_first() {
        let g = graph(
            vec![
                page_block("a", &[("title", text("Old")), ("pub", text("Yes")), ("dt", text("2024-01-01"))]),
                page_block("b", &[("title", text("New")), ("pub", text("Yes")), ("dt", text("2024-06-15"))]),
            ],
            vec![vec!["a", "b"]],
        );
        let pages = extract(&g, "blog");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].date, "2024-06-15");
        assert_eq!(pages[1].date, "2024-01-01");
    }

    #[test]
    fn unpublished_pages_are_dropped() {
        let g = graph(
            vec![
                page_block("a", &[("title", text("Draft")), ("pub", text("No"))]),
                page_block("b", &[("title", text("Live")), ("pub", text("yes"))]),
            ],
            vec![vec!["a", "b"]],
        );
        let pages = extract(&g, "blog");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "Live");
    }

    #[test]
    fn pages_without_a_published_column_are_dropped() {
        let mut g = graph(
            vec![page_block("a", &[("title", text("Untracked"))])],
            vec![vec!["a"]],
        );
        g.schema.shift_remove("pub");
        let mapping = map_schema(&g.schema, "page", None, None);
        assert!(mapping.published_key.is_none());
        assert!(extract(&g, "page").is_empty());
    }

    #[test]
    fn cover_property_text_is_not_a_cover() {
        let mut g = graph(
            vec![page_block("a", &[("pub", text("Yes")), ("cv", text("cover.png"))])],
            vec![vec!["a"]],
        );
        g.schema.insert(
            "cv".into(),
            PropertySchema {
                name: "Cover".into(),
                kind: "file".into(),
            },
        );
        let mapping = map_schema(&g.schema, "page", None, None);
        assert_eq!(mapping.cover_key.as_deref(), Some("cv"));
        assert!(extract(&g, "page")[0].cover_image.is_none());
    }

    #[test]
    fn one_bad_block_leaves_its_siblings_extractable() {
        let mut g: BlockGraph = serde_json::from_value(json!({
            "blocks": {
                "ok": {
                    "id": "ok",
                    "type": "page",
                    "properties": {"title": "Still here", "pub": [["Yes"]]},
                    "created_time": null,
                },
                "bad": {"id": "bad", "type": "page", "properties": ["nope"]},
            },
            "views": [{"block_ids": ["bad", "ok"]}],
        }))
        .expect("graph decodes");
        g.schema = schema();

        let pages = extract(&g, "page");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].id, "ok");
        assert_eq!(pages[0].title, "Still here");
    }

    #[test]
    fn slug_falls_back_to_block_id() {
        let g = graph(
            vec![page_block("abc123", &[("title", text("T")), ("pub", text("Yes"))])],
            vec![vec!["abc123"]],
        );
        let pages = extract(&g, "page");
        assert_eq!(pages[0].slug, "abc123");
    }

    #[test]
    fn members_are_deduplicated_and_non_pages_skipped() {
        let mut code = page_block("c", &[]);
        code.kind = "code".into();
        let mut bare = page_block("d", &[]);
        bare.properties = None;

        let g = graph(
            vec![
                page_block("a", &[("title", text("A")), ("pub", text("Yes"))]),
                code,
                bare,
            ],
            vec![vec!["a", "missing", "c"], vec!["d", "a"]],
        );
        let pages = extract(&g, "page");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].id, "a");
    }

    #[test]
    fn structured_date_beats_plain_text() {
        let annotated: RichText =
            serde_json::from_value(json!([["Jan 1", [["d", {"type": "date", "start_date": "2024-01-01"}]]]]))
                .expect("rich text");
        let g = graph(
            vec![
                page_block("a", &[("pub", text("Yes")), ("dt", annotated)]),
                page_block("b", &[("pub", text("Yes")), ("dt", text("someday"))]),
                page_block("c", &[("pub", text("Yes"))]),
            ],
            vec![vec!["a", "b", "c"]],
        );
        let pages = extract(&g, "page");
        assert_eq!(pages[0].date, "2024-01-01");
        assert_eq!(pages[1].date, "someday");
        assert_eq!(pages[2].date, "");
    }

    #[test]
    fn metadata_lists_are_split_and_empty_values_omitted() {
        let g = graph(
            vec![
                page_block(
                    "a",
                    &[("pub", text("Yes")), ("tg", text("rust, ,web ")), ("ds", text("  "))],
                ),
                page_block("b", &[("pub", text("Yes")), ("tg", text(" , "))]),
            ],
            vec![vec!["a", "b"]],
        );
        let pages = extract(&g, "blog");
        let a = pages.iter().find(|p| p.id == "a").expect("page a");
        assert_eq!(
            a.metadata["tags"],
            MetadataValue::List(vec!["rust".into(), "web".into()])
        );
        assert!(a.description.is_none());

        let b = pages.iter().find(|p| p.id == "b").expect("page b");
        assert!(b.metadata.is_empty());
    }

    #[test]
    fn type_select_overrides_default_page_type() {
        let mut g = graph(
            vec![page_block("a", &[("pub", text("Yes")), ("ty", text("Project"))])],
            vec![vec!["a"]],
        );
        g.schema.insert(
            "ty".into(),
            PropertySchema {
                name: "Type".into(),
                kind: "select".into(),
            },
        );
        let pages = extract(&g, "page");
        assert_eq!(pages[0].page_type, "project");
    }

    #[test]
    fn order_and_boolean_metadata() {
        let mut g = graph(
            vec![
                page_block("a", &[("pub", text("Yes")), ("ord", text("3")), ("ft", text("Yes"))]),
                page_block("b", &[("pub", text("true")), ("ord", text("third"))]),
            ],
            vec![vec!["a", "b"]],
        );
        g.schema.insert("ord".into(), PropertySchema { name: "Order".into(), kind: "number".into() });
        g.schema.insert("ft".into(), PropertySchema { name: "Featured".into(), kind: "checkbox".into() });

        let pages = extract(&g, "project");
        assert_eq!(pages[0].order, Some(3));
        assert_eq!(pages[0].metadata["featured"], MetadataValue::Bool(true));
        assert_eq!(pages[1].metadata["order"], MetadataValue::Number(0));
    }

    #[test]
    fn frontmatter_overrides_before_publish_filter() {
        let mut page = page_block("a", &[("title", text("From DB")), ("pub", text("Yes"))]);
        page.content = vec!["fm".into()];
        let mut code = page_block("fm", &[("title", text("title: From Frontmatter\nslug: /custom"))]);
        code.kind = "code".into();

        let g = graph(vec![page, code], vec![vec!["a"]]);
        let pages = extract(&g, "page");
        assert_eq!(pages[0].title, "From Frontmatter");
        assert_eq!(pages[0].slug, "custom");
        assert!(pages[0].frontmatter.is_some());
    }

    #[test]
    fn cover_goes_through_url_mapper() {
        let mut block = page_block("a", &[("pub", text("Yes"))]);
        block.format = Some(BlockFormat {
            page_cover: Some("/images/page-cover/x.png".into()),
            ..Default::default()
        });
        let g = graph(vec![block], vec![vec!["a"]]);
        let mapping = map_schema(&g.schema, "page", None, None);
        let mapper = |raw: &str, b: &Block| format!("mapped:{}:{raw}", b.id);
        let pages = extract_pages(
            &g,
            &mapping,
            &ExtractOptions {
                default_page_type: "page",
                image_urls: &mapper,
            },
        );
        assert_eq!(
            pages[0].cover_image.as_deref(),
            Some("mapped:a:/images/page-cover/x.png")
        );
    }

    #[test]
    fn docs_pages_are_linked_under_structural_parent() {
        let root = page_block("root", &[("title", text("Guide")), ("pub", text("Yes"))]);
        let mut child = page_block("child", &[("title", text("Install")), ("pub", text("Yes"))]);
        child.parent_id = Some("root".into());
        let g = graph(vec![root, child], vec![vec!["root", "child"]]);

        let pages = extract(&g, "docs");
        assert_eq!(pages[0].children, vec!["child"]);
        assert_eq!(pages[1].parent.as_deref(), Some("root"));
    }

    #[test]
    fn fixture_collection_extracts() {
        let fixture = std::fs::read_to_string("../../../fixtures/json/blog.fixture.json")
            .expect("read fixture");
        let g: BlockGraph = serde_json::from_str(&fixture).expect("deserialize fixture graph");
        let pages = extract(&g, "blog");

        let slugs: Vec<&str> = pages.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["summer-update", "hello-world"]);
        assert_eq!(pages[1].metadata["tags"].as_list().map(<[String]>::len), Some(2));
        assert_eq!(pages[0].author.as_deref(), Some("Ada"));
    }
}
