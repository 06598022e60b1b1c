//! HTML5 parsing of page snapshots with html5ever.
//!
//! The tree html5ever builds (implied `html`/`head`/`body`, implied end tags,
//! the full named character reference table) is copied into a [`Document`]
//! arena. Doctypes, comments and processing instructions are dropped; every
//! text node is kept, whitespace included, so offsets match what a browser
//! would expose.

use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use super::{Document, NodeId};
use crate::error::{ReformaError, Result};

pub fn parse_html(input: &str) -> Result<Document> {
    let dom: RcDom = parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut input.as_bytes())
        .map_err(|e| ReformaError::HtmlParse(e.to_string()))?;

    let mut doc = Document::new();
    let root = doc.root();
    convert_node(&mut doc, &dom.document, root);
    Ok(doc)
}

fn convert_node(doc: &mut Document, handle: &Handle, parent: NodeId) {
    match &handle.data {
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                convert_node(doc, child, parent);
            }
        }

        NodeData::Text { contents } => {
            let node = doc.create_text(&contents.borrow());
            doc.append_child(parent, node);
        }

        NodeData::Element { name, attrs, .. } => {
            let node = doc.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                doc.set_attr(node, &attr.name.local, &attr.value);
            }
            doc.append_child(parent, node);

            for child in handle.children.borrow().iter() {
                convert_node(doc, child, node);
            }
        }

        NodeData::Doctype { .. }
        | NodeData::Comment { .. }
        | NodeData::ProcessingInstruction { .. } => {}
    }
}
