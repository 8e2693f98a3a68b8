//! The block graph delivered by the content source.
//!
//! A graph is a flat table of blocks keyed by id, plus the property schema of
//! one collection and the member lists of its saved views. Parent/child
//! structure is expressed through id references, never through nesting.
//!
//! Rich-text values use the source's compact array encoding:
//!
//! ```json
//! [["Launch day "], ["Jan 1, 2024", [["d", {"type": "date", "start_date": "2024-01-01"}]]]]
//! ```
//!
//! Each segment is `[text, decorations?]` and each decoration is
//! `[kind, payload?]`.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Block type for pages (collection members and nested pages alike).
pub const PAGE_BLOCK: &str = "page";

/// Block type for code blocks (used for inline frontmatter).
pub const CODE_BLOCK: &str = "code";

/// Block type for images.
pub const IMAGE_BLOCK: &str = "image";

/// Decoration kind carrying a structured date.
const DATE_DECORATION: &str = "d";

// ---------------------------------------------------------------------------
// BlockGraph
// ---------------------------------------------------------------------------

/// One fetched collection: blocks, schema and view results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockGraph {
    /// Every block in the fetch, keyed by id, in delivery order.
    ///
    /// Blocks that do not decode are dropped one by one; the rest of the
    /// graph still loads.
    #[serde(default, deserialize_with = "decode_blocks")]
    pub blocks: IndexMap<String, Block>,
    /// Property id → declared name and storage type.
    #[serde(default)]
    pub schema: IndexMap<String, PropertySchema>,
    /// Saved view query results.
    #[serde(default)]
    pub views: Vec<ViewQuery>,
    /// Pre-signed asset URLs keyed by block id.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub signed_urls: IndexMap<String, String>,
}

impl BlockGraph {
    /// Look up a block by id.
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.get(id)
    }

    /// Member block ids across all views, de-duplicated in first-seen order.
    pub fn member_ids(&self) -> Vec<&str> {
        let mut seen: IndexSet<&str> = IndexSet::new();
        for view in &self.views {
            for id in &view.block_ids {
                seen.insert(id.as_str());
            }
        }
        seen.into_iter().collect()
    }

    /// The first child block of `block`, if it has one in this graph.
    pub fn first_child(&self, block: &Block) -> Option<&Block> {
        block.content.first().and_then(|id| self.block(id))
    }
}

/// A single collection column declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Human-authored column name.
    pub name: String,
    /// Storage type (`title`, `text`, `select`, `checkbox`, `date`, ...).
    #[serde(rename = "type")]
    pub kind: String,
}

/// The result of querying one saved view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewQuery {
    /// Member block ids in view order.
    #[serde(default)]
    pub block_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A node in the block table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub id: String,
    /// Structural type (`page`, `code`, `image`, `bookmark`, `text`, ...).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Property id → rich-text value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, RichText>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<BlockFormat>,
    /// Child block ids in display order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Creation time, epoch milliseconds.
    #[serde(default, deserialize_with = "epoch_millis")]
    pub created_time: i64,
    /// Last edit time, epoch milliseconds.
    #[serde(default, deserialize_with = "epoch_millis")]
    pub last_edited_time: i64,
}

impl Block {
    /// Whether this block is structurally a page.
    pub fn is_page(&self) -> bool {
        self.kind == PAGE_BLOCK
    }

    /// Rich-text value of a property, if present.
    pub fn property(&self, key: &str) -> Option<&RichText> {
        self.properties.as_ref()?.get(key)
    }
}

fn decode_blocks<'de, D>(deserializer: D) -> Result<IndexMap<String, Block>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndexMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut blocks = IndexMap::with_capacity(raw.len());
    for (id, value) in raw {
        match serde_json::from_value::<Block>(value) {
            Ok(block) => {
                blocks.insert(id, block);
            }
            Err(e) => tracing::debug!(block = %id, error = %e, "skipping undecodable block"),
        }
    }
    Ok(blocks)
}

// Integers pass through, floats truncate, numeric strings parse. Anything
// else, null included, is 0.
fn epoch_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Display options attached to a block. Only the asset-bearing fields are
/// typed; everything else is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark_cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark_icon: Option<String>,
    /// Resolved display source for media blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_source: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Rich text
// ---------------------------------------------------------------------------

/// A property value: a list of decorated text segments.
///
/// A bare string decodes as one undecorated segment; any other non-array
/// value decodes as empty text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Vec<TextSegment>")]
pub struct RichText(pub Vec<TextSegment>);

impl From<Value> for RichText {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(segments) => Self(segments.into_iter().map(TextSegment::from).collect()),
            Value::String(text) => Self::from_text(text),
            _ => Self::default(),
        }
    }
}

impl From<RichText> for Vec<TextSegment> {
    fn from(text: RichText) -> Self {
        text.0
    }
}

impl RichText {
    /// A single undecorated segment.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self(vec![TextSegment {
            text: text.into(),
            decorations: Vec::new(),
        }])
    }

    /// Concatenated text of every segment.
    pub fn plain_text(&self) -> String {
        self.0.iter().map(|s| s.text.as_str()).collect()
    }

    /// The first structured date annotation's start date, if any.
    pub fn date_annotation(&self) -> Option<String> {
        self.0
            .iter()
            .flat_map(|s| s.decorations.iter())
            .filter(|d| d.kind == DATE_DECORATION)
            .find_map(|d| {
                d.payload
                    .as_ref()?
                    .get("start_date")?
                    .as_str()
                    .map(str::to_owned)
            })
    }

    /// Rewrite the text of every segment through `f`.
    pub fn map_text(&mut self, mut f: impl FnMut(&str) -> Option<String>) {
        for segment in &mut self.0 {
            if let Some(replacement) = f(&segment.text) {
                segment.text = replacement;
            }
        }
    }
}

/// One `[text, decorations?]` segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Vec<Value>")]
pub struct TextSegment {
    pub text: String,
    pub decorations: Vec<Decoration>,
}

/// One `[kind, payload?]` annotation on a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoration {
    /// Single-letter kind (`b`, `i`, `a`, `d`, ...).
    pub kind: String,
    pub payload: Option<Value>,
}

impl Decoration {
    fn from_value(value: Value) -> Option<Self> {
        let Value::Array(parts) = value else {
            return None;
        };
        let mut parts = parts.into_iter();
        let kind = match parts.next()? {
            Value::String(kind) => kind,
            _ => return None,
        };
        Some(Self {
            kind,
            payload: parts.next(),
        })
    }

    fn into_value(self) -> Value {
        let mut parts = vec![Value::String(self.kind)];
        if let Some(payload) = self.payload {
            parts.push(payload);
        }
        Value::Array(parts)
    }
}

// Lenient on the way in: a bare string is an undecorated segment and any
// other malformed segment degrades to empty text.
impl From<Value> for TextSegment {
    fn from(raw: Value) -> Self {
        let raw = match raw {
            Value::Array(items) => items,
            Value::String(text) => {
                return Self {
                    text,
                    decorations: Vec::new(),
                };
            }
            _ => return Self::default(),
        };
        let mut items = raw.into_iter();
        let text = match items.next() {
            Some(Value::String(text)) => text,
            _ => String::new(),
        };
        let decorations = match items.next() {
            Some(Value::Array(decorations)) => decorations
                .into_iter()
                .filter_map(Decoration::from_value)
                .collect(),
            _ => Vec::new(),
        };
        Self { text, decorations }
    }
}

impl From<TextSegment> for Vec<Value> {
    fn from(segment: TextSegment) -> Self {
        let mut out = vec![Value::String(segment.text)];
        if !segment.decorations.is_empty() {
            out.push(Value::Array(
                segment
                    .decorations
                    .into_iter()
                    .map(Decoration::into_value)
                    .collect(),
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rich_text_decodes_compact_arrays() {
        let raw = json!([["Hello "], ["world", [["b"], ["a", "https://example.com"]]]]);
        let text: RichText = serde_json::from_value(raw).expect("decode");
        assert_eq!(text.plain_text(), "Hello world");
        assert_eq!(text.0[1].decorations.len(), 2);
        assert_eq!(text.0[1].decorations[0].kind, "b");
        assert!(text.0[1].decorations[0].payload.is_none());
    }

    #[test]
    fn date_annotation_is_found_in_decorations() {
        let raw = json!([["‣", [["d", {"type": "date", "start_date": "2024-06-15"}]]]]);
        let text: RichText = serde_json::from_value(raw).expect("decode");
        assert_eq!(text.date_annotation().as_deref(), Some("2024-06-15"));
        assert_eq!(RichText::from_text("June 15").date_annotation(), None);
    }

    #[test]
    fn malformed_segment_degrades_to_empty_text() {
        let raw = json!([[42], ["ok"]]);
        let text: RichText = serde_json::from_value(raw).expect("decode");
        assert_eq!(text.plain_text(), "ok");
    }

    #[test]
    fn loose_property_shapes_still_read_as_text() {
        let raw = json!({"a": "Plain title", "b": ["Hi ", ["there"]], "c": 7});
        let props: IndexMap<String, RichText> = serde_json::from_value(raw).expect("decode");
        assert_eq!(props["a"].plain_text(), "Plain title");
        assert_eq!(props["b"].plain_text(), "Hi there");
        assert_eq!(props["c"].plain_text(), "");

        // Encoding stays in the compact array form.
        assert_eq!(serde_json::to_value(&props["a"]).expect("encode"), json!([["Plain title"]]));
    }

    #[test]
    fn bad_blocks_do_not_sink_the_graph() {
        let raw = json!({
            "blocks": {
                "good": {
                    "id": "good",
                    "type": "page",
                    "properties": {"title": [["Kept"]]},
                    "created_time": 1_700_000_000_000_i64,
                },
                "untyped": {"id": "untyped", "properties": {"title": "Loose"}},
                "nulls": {"id": "nulls", "type": "text", "created_time": null, "last_edited_time": 1.5e12},
                "broken": {"id": "broken", "type": "page", "content": "not-a-list"},
                "scalar": 42,
            },
            "views": [{"block_ids": ["good", "broken"]}],
        });
        let graph: BlockGraph = serde_json::from_value(raw).expect("graph decodes");

        assert_eq!(graph.blocks.len(), 3);
        assert!(!graph.blocks.contains_key("broken"));
        assert!(!graph.blocks.contains_key("scalar"));
        assert!(graph.blocks["good"].is_page());
        assert_eq!(graph.blocks["good"].created_time, 1_700_000_000_000);
        assert_eq!(graph.blocks["untyped"].kind, "");
        assert_eq!(
            graph.blocks["untyped"].property("title").map(RichText::plain_text).as_deref(),
            Some("Loose")
        );
        assert_eq!(graph.blocks["nulls"].created_time, 0);
        assert_eq!(graph.blocks["nulls"].last_edited_time, 1_500_000_000_000);
    }

    #[test]
    fn member_ids_are_deduplicated_in_first_seen_order() {
        let graph = BlockGraph {
            views: vec![
                ViewQuery {
                    block_ids: vec!["b".into(), "a".into()],
                },
                ViewQuery {
                    block_ids: vec!["a".into(), "c".into(), "b".into()],
                },
            ],
            ..Default::default()
        };
        assert_eq!(graph.member_ids(), vec!["b", "a", "c"]);
    }

    #[test]
    fn format_keeps_unknown_fields() {
        let raw = json!({
            "id": "p1",
            "type": "page",
            "format": {"page_cover": "https://cdn.example.com/c.png", "page_icon": "🚀"},
        });
        let block: Block = serde_json::from_value(raw).expect("decode");
        let format = block.format.as_ref().expect("format");
        assert_eq!(format.page_cover.as_deref(), Some("https://cdn.example.com/c.png"));
        assert_eq!(format.extra.get("page_icon"), Some(&json!("🚀")));

        let back = serde_json::to_value(&block).expect("encode");
        assert_eq!(back["format"]["page_icon"], json!("🚀"));
    }
}
