//! End-to-end rendering scenarios

use std::sync::Arc;

use cartridge_dom::{
    render_page, CartridgeConfig, DiskStyleCache, DomArena, DomNode, MemoryStyleCache, NodeId,
    ShadowRootMode, StyleCache, StyleSheet, Template, TreeLoader,
};

fn config(folder: &str) -> CartridgeConfig {
    CartridgeConfig {
        styles_sheets_folder: Some(folder.to_string()),
        ..CartridgeConfig::default()
    }
}

fn widget(arena: &mut DomArena, tag: &str, sheets: &[u32]) -> NodeId {
    let host = arena.add_node(DomNode::element(tag));
    arena.attach_shadow(host, ShadowRootMode::Open).unwrap();
    for &sheet in sheets {
        arena.adopt_style_sheet(host, sheet).unwrap();
    }
    host
}

#[tokio::test]
async fn nested_widgets_share_one_generated_sheet() {
    let mut arena = DomArena::new();
    let sheet = arena.add_sheet(StyleSheet::new(["div{color:red}"]));
    let outer = widget(&mut arena, "my-widget", &[sheet]);
    let inner = widget(&mut arena, "my-widget", &[sheet]);
    arena.append_child(outer, inner).unwrap();
    arena.set_root(outer).unwrap();

    let cache = Arc::new(MemoryStyleCache::new());
    let output = render_page(&arena, cache.clone(), &config("public/styles"))
        .await
        .unwrap();

    let shadow = r#"<template tag="my-widget" shadowrootmode="open"><link rel="stylesheet" href="/styles/my-widget-0.css"></template>"#;
    assert_eq!(
        output.html,
        format!("<my-widget>{shadow}<my-widget>{shadow}</my-widget></my-widget>")
    );
    assert_eq!(cache.len().await.unwrap(), 1);
    assert_eq!(
        cache.get("my-widget-0").await.unwrap().as_deref(),
        Some("div{color:red}")
    );
}

#[tokio::test]
async fn rendering_is_deterministic() {
    let snapshot = serde_json::json!({
        "styleSheets": [
            { "rules": [":host{display:block}"], "shared": true },
            { "rules": ["p{margin:0}", "p+p{margin-top:1em}"] },
            { "rules": ["*{box-sizing:border-box}"] }
        ],
        "root": {
            "nodeType": 11,
            "children": [
                { "nodeType": 7, "nodeName": "layout", "nodeValue": "stack" },
                {
                    "nodeType": 1, "nodeName": "x-article", "attributes": ["data-id", "1", "class", "a"],
                    "shadowRoot": { "styleSheets": [0, 1], "globalStyles": [2], "children": [
                        { "nodeType": 1, "nodeName": "slot" }
                    ]},
                    "children": [{ "nodeType": 3, "nodeValue": "First" }]
                },
                {
                    "nodeType": 1, "nodeName": "x-article", "attributes": ["data-id", "2"],
                    "shadowRoot": { "styleSheets": [0, 1], "globalStyles": [2] },
                    "children": [{ "nodeType": 3, "nodeValue": "Second" }]
                }
            ]
        }
    });

    let mut loader = TreeLoader::new();
    loader.load(&snapshot).unwrap();
    let arena = loader.into_arena();
    let cache: Arc<dyn StyleCache> = Arc::new(MemoryStyleCache::new());
    let config = config("styles");

    let first = render_page(&arena, cache.clone(), &config).await.unwrap();
    let second = render_page(&arena, cache.clone(), &config).await.unwrap();

    assert_eq!(first.html, second.html);
    assert_eq!(first.head, second.head);
    assert!(first.html.starts_with("<?layout stack><x-article data-id=\"1\" class=\"a\">"));
    assert_eq!(
        first.head,
        "<title>Cartridge</title><style data-associated-tag-name=\"x-article\">*{box-sizing:border-box}</style>"
    );
}

#[tokio::test]
async fn many_instances_of_a_tag_write_the_cache_once() {
    let mut arena = DomArena::new();
    let sheet = arena.add_sheet(StyleSheet::new(["li{list-style:none}"]));
    let root = arena.add_node(DomNode::element("ul"));
    for _ in 0..25 {
        let item = widget(&mut arena, "x-item", &[sheet]);
        arena.append_child(root, item).unwrap();
    }
    arena.set_root(root).unwrap();

    let cache = Arc::new(MemoryStyleCache::new());
    let output = render_page(&arena, cache.clone(), &config("styles"))
        .await
        .unwrap();

    assert_eq!(cache.len().await.unwrap(), 1);
    assert_eq!(output.html.matches("/styles/x-item-0.css").count(), 25);
}

#[tokio::test]
async fn shared_sheets_link_even_when_inlining_everything() {
    let mut arena = DomArena::new();
    let base = arena.add_sheet(StyleSheet::shared([":host{font:inherit}"]));
    let local = arena.add_sheet(StyleSheet::new(["button{cursor:pointer}"]));
    let root = arena.add_node(DomNode::fragment());
    let card = widget(&mut arena, "x-card", &[base]);
    let button = widget(&mut arena, "x-button", &[base, local]);
    arena.append_child(root, card).unwrap();
    arena.append_child(root, button).unwrap();
    arena.set_root(root).unwrap();

    let config = CartridgeConfig {
        inline_all_component_styles: true,
        ..config("styles")
    };
    let cache = Arc::new(MemoryStyleCache::new());
    let output = render_page(&arena, cache.clone(), &config).await.unwrap();

    assert_eq!(
        output.html.matches(r#"<link rel="stylesheet" href="/styles/shared-0.css">"#).count(),
        2
    );
    assert!(output.html.contains("<style>button{cursor:pointer}</style>"));
    assert!(!output.html.contains("<style>:host{font:inherit}</style>"));
    assert_eq!(cache.len().await.unwrap(), 2);
}

#[tokio::test]
async fn element_can_ask_for_inline_styles() {
    let mut arena = DomArena::new();
    let sheet = arena.add_sheet(StyleSheet::new(["h1{font-size:2rem}"]));
    let host = arena.add_node(DomNode::element("x-hero").with_inline_styles(true));
    arena.attach_shadow(host, ShadowRootMode::Open).unwrap();
    arena.adopt_style_sheet(host, sheet).unwrap();
    arena.set_root(host).unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let folder = tmp.path().join("ct-stylesheets");
    let cache = Arc::new(DiskStyleCache::new(&folder));
    let output = render_page(&arena, cache, &config("ct-stylesheets"))
        .await
        .unwrap();

    assert!(output.html.contains("<style>h1{font-size:2rem}</style>"));
    assert_eq!(
        std::fs::read_to_string(folder.join("x-hero-0.css")).unwrap(),
        "h1{font-size:2rem}"
    );
}

#[tokio::test]
async fn template_receives_head_and_body() {
    let mut arena = DomArena::new();
    let root = arena.add_node(DomNode::element("main"));
    let text = arena.add_node(DomNode::text("a < b"));
    arena.append_child(root, text).unwrap();
    arena.set_root(root).unwrap();

    let output = render_page(&arena, Arc::new(MemoryStyleCache::new()), &CartridgeConfig::default())
        .await
        .unwrap();
    let page = Template::default().apply(&output);

    assert!(page.contains("<head>\n<title>Cartridge</title>\n</head>"));
    assert!(page.contains("<body>\n<main>a < b</main>\n</body>"));
}
