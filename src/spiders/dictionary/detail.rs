//! Field extraction for a character's detail page.
//!
//! Every group of fields is read independently and a group whose markup is
//! missing simply yields empty strings, so a partially recognised page still
//! produces a complete entry.

use log::debug;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::text::{char_find, char_window, normalize, render_listing};

pub const BASIC_HEADING: &str = "基本解释";
pub const DETAILED_MARKER: &str = "详细字义";
pub const WORD_CLASS_MARKER: &str = "词性变化";

/// Marker length plus the closing quote and comma of its listing item.
const MARKER_OFFSET: isize = 6;

/// Hidden block holding the general-dictionary text when nothing is shifted.
pub const GENERAL_BLOCK_ANCHOR: usize = 2;

const HIDDEN_BLOCK_CLASS: &str = "zi_text_content hide";

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static PINYIN_ITEM: Lazy<Selector> =
    Lazy::new(|| selector(r#"div[class="list_tico"] > ul > li:nth-of-type(1)"#));
static STROKES_ITEM: Lazy<Selector> =
    Lazy::new(|| selector(r#"div[class="list_tico"] > ul > li:nth-of-type(4)"#));
static RADICAL_ITEM: Lazy<Selector> =
    Lazy::new(|| selector(r#"div[class="list_tico"] > ul > li:nth-of-type(7)"#));

static BASIC_HEADINGS: Lazy<Selector> = Lazy::new(|| {
    selector(r#"div[class="cont_hzcx"] > div[class="zi_text_content"] > h2:nth-of-type(1)"#)
});
static BASIC_FIRST_PARAGRAPH: Lazy<Selector> = Lazy::new(|| {
    selector(r#"div[class="cont_hzcx"] > div[class="zi_text_content"] > p:nth-of-type(1)"#)
});
static BASIC_LATER_PARAGRAPHS: Lazy<Selector> = Lazy::new(|| {
    selector(r#"div[class="cont_hzcx"] > div[class="zi_text_content"] > p:nth-of-type(n+2)"#)
});
static NAV_ITEMS: Lazy<Selector> = Lazy::new(|| selector(r#"div[class="nav_b"] > ul > li"#));

static DETAIL_CONTAINERS: Lazy<Selector> = Lazy::new(|| selector(r#"div[class="cont_hzcx"]"#));
static HOMOPHONE_LINKS: Lazy<Selector> =
    Lazy::new(|| selector(r#"div[class="list_b"] > ul > li > a"#));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailedDefinitions {
    pub detailed_meaning: String,
    pub word_class_change: String,
    /// 1 when the detailed-meaning label is missing, which moves the
    /// general-dictionary text one hidden block earlier.
    pub shift: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterDetail {
    pub pinyin: String,
    pub strokes: String,
    pub radical: String,
    pub basic_definition: String,
    pub detailed: DetailedDefinitions,
    pub homophones: String,
    pub general_dictionary: String,
}

impl CharacterDetail {
    pub fn general_block_index(&self) -> usize {
        general_block_index(self.detailed.shift)
    }
}

pub fn general_block_index(shift: usize) -> usize {
    GENERAL_BLOCK_ANCHOR - shift
}

pub fn parse_character_detail(body: &str) -> CharacterDetail {
    let doc = Html::parse_document(body);

    let detailed = extract_detailed(&doc);
    let general_dictionary = extract_general(&doc, detailed.shift);

    CharacterDetail {
        pinyin: normalize(&first_direct_text(&doc, &PINYIN_ITEM)),
        strokes: normalize(&first_direct_text(&doc, &STROKES_ITEM)),
        radical: normalize(&first_direct_text(&doc, &RADICAL_ITEM)),
        basic_definition: extract_basic_definition(&doc),
        detailed,
        homophones: normalize(&extract_homophones(&doc)),
        general_dictionary,
    }
}

/// One way a page may lay out its basic definition.
pub trait BasicDefinitionStrategy: Sync {
    fn name(&self) -> &'static str;

    /// `None` when the page does not use this layout.
    fn extract(&self, doc: &Html) -> Option<String>;
}

/// A `基本解释` heading inside the content block, definition in the first paragraph.
pub struct HeadingLayout;

impl BasicDefinitionStrategy for HeadingLayout {
    fn name(&self) -> &'static str {
        "heading"
    }

    fn extract(&self, doc: &Html) -> Option<String> {
        let heading = first_meaningful(doc.select(&BASIC_HEADINGS).flat_map(direct_text))?;
        if heading != BASIC_HEADING {
            return None;
        }
        Some(
            doc.select(&BASIC_FIRST_PARAGRAPH)
                .flat_map(|p| p.text())
                .collect(),
        )
    }
}

/// The label sits in the navigation tabs, definition in every paragraph after the first.
pub struct NavigationLayout;

impl BasicDefinitionStrategy for NavigationLayout {
    fn name(&self) -> &'static str {
        "navigation"
    }

    fn extract(&self, doc: &Html) -> Option<String> {
        let label = first_meaningful(doc.select(&NAV_ITEMS).flat_map(|li| li.text()))?;
        if label != BASIC_HEADING {
            return None;
        }
        Some(
            doc.select(&BASIC_LATER_PARAGRAPHS)
                .flat_map(direct_text)
                .collect(),
        )
    }
}

/// Tried in order; the first layout that applies wins.
pub static BASIC_DEFINITION_STRATEGIES: &[&dyn BasicDefinitionStrategy] =
    &[&HeadingLayout, &NavigationLayout];

pub fn extract_basic_definition(doc: &Html) -> String {
    BASIC_DEFINITION_STRATEGIES
        .iter()
        .find_map(|strategy| {
            strategy.extract(doc).map(|text| {
                debug!("Basic definition found via {} layout", strategy.name());
                normalize(&text)
            })
        })
        .unwrap_or_default()
}

pub fn extract_detailed(doc: &Html) -> DetailedDefinitions {
    let paragraphs: Vec<ElementRef> = hidden_blocks(doc, 1)
        .into_iter()
        .flat_map(|block| child_elements(block, "p"))
        .collect();

    let has_label = |position: usize| {
        paragraphs.iter().any(|p| {
            child_elements(*p, "b")
                .nth(position - 1)
                .is_some_and(|b| direct_text(b).next().is_some())
        })
    };

    let nodes: Vec<&str> = paragraphs.iter().flat_map(|p| p.text()).collect();
    let listing: Vec<char> = render_listing(&nodes).chars().collect();
    let word_class_at = char_find(&listing, WORD_CLASS_MARKER);

    let mut detailed = DetailedDefinitions::default();
    if has_label(1) {
        let start = char_find(&listing, DETAILED_MARKER) + MARKER_OFFSET;
        detailed.detailed_meaning = normalize(&char_window(&listing, start, word_class_at));
    } else {
        detailed.shift = 1;
    }
    if has_label(3) {
        let start = word_class_at + MARKER_OFFSET;
        detailed.word_class_change = normalize(&char_window(&listing, start, -1));
    }
    detailed
}

fn extract_general(doc: &Html, shift: usize) -> String {
    let text: String = hidden_blocks(doc, general_block_index(shift))
        .into_iter()
        .filter_map(|block| child_elements(block, "p").next())
        .flat_map(direct_text)
        .collect();
    normalize(&text)
}

fn extract_homophones(doc: &Html) -> String {
    doc.select(&HOMOPHONE_LINKS).flat_map(direct_text).collect()
}

/// The hidden content block at 1-based `position` under each detail
/// container, counting only divs whose class is exactly the hidden class.
fn hidden_blocks(doc: &Html, position: usize) -> Vec<ElementRef<'_>> {
    if position == 0 {
        return Vec::new();
    }
    doc.select(&DETAIL_CONTAINERS)
        .filter_map(|container| {
            child_elements(container, "div")
                .filter(|div| div.value().attr("class") == Some(HIDDEN_BLOCK_CLASS))
                .nth(position - 1)
        })
        .collect()
}

fn child_elements<'a>(
    element: ElementRef<'a>,
    tag: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == tag)
}

fn direct_text<'a>(element: ElementRef<'a>) -> impl Iterator<Item = &'a str> {
    element
        .children()
        .filter_map(|node| node.value().as_text().map(|text| &**text))
}

fn first_direct_text(doc: &Html, selector: &Selector) -> String {
    doc.select(selector)
        .flat_map(direct_text)
        .next()
        .map(str::to_string)
        .unwrap_or_default()
}

fn first_meaningful<'a>(mut nodes: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    nodes.find(|t| !t.trim().is_empty()).map(str::trim)
}
