//! Element names a styled declaration may render.

use std::collections::HashSet;

lazy_static::lazy_static! {
    static ref HTML_TAGS: HashSet<&'static str> = [
        "a", "abbr", "address", "area", "article", "aside", "audio",
        "b", "base", "bdi", "bdo", "big", "blockquote", "body", "br", "button",
        "canvas", "caption", "cite", "code", "col", "colgroup",
        "data", "datalist", "dd", "del", "details", "dfn", "dialog", "div", "dl", "dt",
        "em", "embed",
        "fieldset", "figcaption", "figure", "footer", "form",
        "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup", "hr", "html",
        "i", "iframe", "img", "input", "ins",
        "kbd", "keygen",
        "label", "legend", "li", "link",
        "main", "map", "mark", "menu", "menuitem", "meta", "meter",
        "nav", "noscript",
        "object", "ol", "optgroup", "option", "output",
        "p", "param", "picture", "pre", "progress",
        "q",
        "rp", "rt", "ruby",
        "s", "samp", "script", "search", "section", "select", "slot", "small", "source",
        "span", "strong", "style", "sub", "summary", "sup",
        "table", "tbody", "td", "template", "textarea", "tfoot", "th", "thead", "time",
        "title", "tr", "track",
        "u", "ul",
        "var", "video",
        "wbr",
    ]
    .into_iter()
    .collect();

    static ref SVG_TAGS: HashSet<&'static str> = [
        "circle", "clipPath", "defs", "ellipse", "foreignObject", "g", "image", "line",
        "linearGradient", "marker", "mask", "path", "pattern", "polygon", "polyline",
        "radialGradient", "rect", "stop", "svg", "text", "textPath", "tspan", "use",
    ]
    .into_iter()
    .collect();
}

pub fn is_known_tag(name: &str) -> bool {
    HTML_TAGS.contains(name) || SVG_TAGS.contains(name)
}
