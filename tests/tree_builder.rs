//! Black-box tree-construction tests: feed whole documents through
//! `parse_document` and assert on the resulting arena tree.

use htmlcore::dom::{Dom, NodeData, NodeId};
use htmlcore::interface::QuirksMode;
use htmlcore::{parse_document, ParseOpts};
use tendril::StrTendril;

fn parse(src: &str) -> Dom {
    parse_document(StrTendril::from_slice(src), ParseOpts::default())
}

fn elements_named<'a>(dom: &'a Dom, parent: NodeId, name: &str) -> Vec<NodeId> {
    dom.children(parent)
        .into_iter()
        .filter(|&id| dom.is_element(id) && &*dom.elem_name(id).1 == name)
        .collect()
}

fn only_child_named(dom: &Dom, parent: NodeId, name: &str) -> NodeId {
    let matches = elements_named(dom, parent, name);
    assert_eq!(matches.len(), 1, "expected exactly one <{}> under node", name);
    matches[0]
}

fn text_of(dom: &Dom, id: NodeId) -> String {
    let nodes = dom.nodes();
    match &nodes[id.index()].data {
        NodeData::Text { contents } => contents.borrow().to_string(),
        other => panic!("expected a text node, found {:?}", other),
    }
}

fn doctype_name(dom: &Dom, id: NodeId) -> String {
    let nodes = dom.nodes();
    match &nodes[id.index()].data {
        NodeData::Doctype { name, .. } => name.to_string(),
        other => panic!("expected a doctype node, found {:?}", other),
    }
}

#[test]
fn doctype_html_body_with_text() {
    let dom = parse("<!DOCTYPE html><html><body>Hi</body></html>");
    assert_eq!(dom.quirks_mode.get(), QuirksMode::NoQuirks);

    let doc_children = dom.children(dom.document());
    let doctype = doc_children
        .iter()
        .copied()
        .find(|&id| matches!(dom.nodes()[id.index()].data, NodeData::Doctype { .. }))
        .expect("a doctype node");
    assert_eq!(doctype_name(&dom, doctype), "html");

    let html = only_child_named(&dom, dom.document(), "html");
    let body = only_child_named(&dom, html, "body");
    let body_children = dom.children(body);
    assert_eq!(body_children.len(), 1);
    assert_eq!(text_of(&dom, body_children[0]), "Hi");
}

#[test]
fn implicit_p_closing() {
    let dom = parse("<p>A<p>B");
    let html = only_child_named(&dom, dom.document(), "html");
    let body = only_child_named(&dom, html, "body");
    let ps = elements_named(&dom, body, "p");
    assert_eq!(ps.len(), 2, "two <p> elements, the first implicitly closed by the second");

    let a_text = dom.children(ps[0]);
    assert_eq!(a_text.len(), 1);
    assert_eq!(text_of(&dom, a_text[0]), "A");

    let b_text = dom.children(ps[1]);
    assert_eq!(b_text.len(), 1);
    assert_eq!(text_of(&dom, b_text[0]), "B");
}

#[test]
fn adoption_agency_reparents_across_mismatched_b_i() {
    let dom = parse("<b>1<i>2</b>3</i>");
    let html = only_child_named(&dom, dom.document(), "html");
    let body = only_child_named(&dom, html, "body");
    let body_children = dom.children(body);

    let b = body_children
        .iter()
        .copied()
        .find(|&id| dom.is_element(id) && &*dom.elem_name(id).1 == "b")
        .expect("a <b> under body");
    let top_level_i = body_children
        .iter()
        .copied()
        .find(|&id| dom.is_element(id) && &*dom.elem_name(id).1 == "i")
        .expect("a sibling <i> reparented out from under <b>");

    let b_children = dom.children(b);
    assert_eq!(text_of(&dom, b_children[0]), "1");
    let nested_i = b_children
        .iter()
        .copied()
        .find(|&id| dom.is_element(id) && &*dom.elem_name(id).1 == "i")
        .expect("the original <i> stays nested under <b>");
    assert_eq!(text_of(&dom, dom.children(nested_i)[0]), "2");

    assert_eq!(text_of(&dom, dom.children(top_level_i)[0]), "3");
}

#[test]
fn table_foster_parents_content_with_no_cell_open() {
    // Foster parenting only applies while the current node is itself
    // table/tbody/tfoot/thead/tr; here <b> and the "A" text arrive before
    // any row or cell has opened, so both get pulled out in front of the
    // table rather than becoming its children.
    let dom = parse("<table>A<b>B</b><tr><td>C</td></tr></table>");
    let html = only_child_named(&dom, dom.document(), "html");
    let body = only_child_named(&dom, html, "body");
    let body_children = dom.children(body);

    let table_pos = body_children
        .iter()
        .position(|&id| dom.is_element(id) && &*dom.elem_name(id).1 == "table")
        .expect("a <table> under body");
    let table = body_children[table_pos];

    let foster_text = body_children[..table_pos]
        .iter()
        .copied()
        .find(|&id| !dom.is_element(id))
        .expect("the stray \"A\" foster-parented before the table");
    assert_eq!(text_of(&dom, foster_text), "A");

    let foster_b = body_children[..table_pos]
        .iter()
        .copied()
        .find(|&id| dom.is_element(id) && &*dom.elem_name(id).1 == "b")
        .expect("the stray <b> foster-parented before the table");
    assert_eq!(text_of(&dom, dom.children(foster_b)[0]), "B");

    let tbody = only_child_named(&dom, table, "tbody");
    let tr = only_child_named(&dom, tbody, "tr");
    let td = only_child_named(&dom, tr, "td");
    assert_eq!(text_of(&dom, dom.children(td)[0]), "C");
}

#[test]
fn table_cell_content_is_not_foster_parented() {
    // Once a <td> is open, foster parenting no longer applies (the current
    // node is the cell, not a table/tbody/tr) — misnested inline content
    // stays inside the cell rather than escaping the table.
    let dom = parse("<table><tr><td>x<b>y</table>");
    let html = only_child_named(&dom, dom.document(), "html");
    let body = only_child_named(&dom, html, "body");
    let table = only_child_named(&dom, body, "table");
    let tbody = only_child_named(&dom, table, "tbody");
    let tr = only_child_named(&dom, tbody, "tr");
    let td = only_child_named(&dom, tr, "td");

    let td_children = dom.children(td);
    assert_eq!(text_of(&dom, td_children[0]), "x");
    let b = td_children
        .iter()
        .copied()
        .find(|&id| dom.is_element(id) && &*dom.elem_name(id).1 == "b")
        .expect("<b> stays inside the open cell");
    assert_eq!(text_of(&dom, dom.children(b)[0]), "y");
}

#[test]
fn script_data_runs_to_the_real_end_tag() {
    let dom = parse(r#"<script>var x = "</scr"+"ipt>";</script>"#);
    let html = only_child_named(&dom, dom.document(), "html");
    let head = only_child_named(&dom, html, "head");
    let script = only_child_named(&dom, head, "script");
    let script_children = dom.children(script);
    assert_eq!(script_children.len(), 1);
    assert_eq!(text_of(&dom, script_children[0]), r#"var x = "</scr"+"ipt>";"#);
}

#[test]
fn title_rcdata_resolves_entities() {
    let dom = parse("<title>A &amp; B</title>");
    let html = only_child_named(&dom, dom.document(), "html");
    let head = only_child_named(&dom, html, "head");
    let title = only_child_named(&dom, head, "title");
    let title_children = dom.children(title);
    assert_eq!(title_children.len(), 1);
    assert_eq!(text_of(&dom, title_children[0]), "A & B");
}

#[test]
fn chunk_split_idempotence() {
    let src = "<!DOCTYPE html><html><body><p>One</p><table><tr><td>Two<b>Three</table></body></html>";

    let whole = parse(src);

    fn shape(dom: &Dom, id: NodeId, out: &mut String) {
        if dom.is_element(id) {
            out.push('<');
            out.push_str(&dom.elem_name(id).1);
            out.push('>');
        } else {
            let nodes = dom.nodes();
            match &nodes[id.index()].data {
                NodeData::Text { contents } => out.push_str(&contents.borrow()),
                NodeData::Comment { contents } => out.push_str(contents),
                NodeData::Doctype { name, .. } => {
                    out.push_str("!DOCTYPE ");
                    out.push_str(name);
                }
                NodeData::Document => {}
            }
        }
        for child in dom.children(id) {
            shape(dom, child, out);
        }
    }

    let mut whole_shape = String::new();
    shape(&whole, whole.document(), &mut whole_shape);

    for split_at in [1, 5, 13, 27, src.len() - 1] {
        let split_at = split_at.min(src.len() - 1).max(1);
        let (first, second) = src.split_at(split_at);
        let opts = ParseOpts::default();
        let tree_builder = htmlcore::tree_builder::TreeBuilder::new(opts.tree_builder);
        let tokenizer = htmlcore::tokenizer::Tokenizer::new(tree_builder, opts.tokenizer);
        tokenizer.feed(StrTendril::from_slice(first)).unwrap();
        tokenizer.feed(StrTendril::from_slice(second)).unwrap();
        tokenizer.end();
        let chunked = tokenizer.sink.into_dom();

        let mut chunked_shape = String::new();
        shape(&chunked, chunked.document(), &mut chunked_shape);
        assert_eq!(whole_shape, chunked_shape, "split at byte {split_at} changed the tree");
    }
}
