//! Landing-page renderer.
//!
//! Turns a page and the products its grid blocks reference into a complete
//! HTML document. Rendering does no I/O; the caller loads products per
//! category beforehand.

use std::collections::HashMap;
use std::fmt::Write;

use crate::domain::aggregates::{Background, BlockKind, LandingBlock, LandingPage, Product};
use crate::domain::value_objects::CategoryId;

pub const MIN_IMAGE_WIDTH: i32 = 10;
pub const MAX_IMAGE_WIDTH: i32 = 100;

pub fn render(page: &LandingPage, products: &HashMap<CategoryId, Vec<Product>>) -> String {
    let mut html = String::with_capacity(2048);
    let title = if page.meta_title.is_empty() { &page.title } else { &page.meta_title };
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"uk\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<meta name=\"description\" content=\"{}\">\n</head>\n",
        escape(title),
        escape(&page.meta_description),
    );
    let _ = writeln!(html, "<body class=\"landing\" style=\"{}\">", background_style(&page.background));
    for block in page.ordered_blocks() {
        render_block(&mut html, block, products);
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn render_block(html: &mut String, block: &LandingBlock, products: &HashMap<CategoryId, Vec<Product>>) {
    let _ = write!(
        html,
        "<div class=\"block block-{}\" style=\"position:absolute;top:{}%;left:{}%\">",
        block.kind_name(),
        block.position_top,
        block.position_left,
    );
    match &block.kind {
        BlockKind::Text { content, font, size, color, alignment } => {
            let _ = write!(
                html,
                "<p style=\"font-family:'{}';font-size:{}px;color:{};text-align:{}\">{}</p>",
                escape(font),
                size,
                escape(color),
                alignment.as_str(),
                escape(content).replace('\n', "<br>"),
            );
        }
        BlockKind::Image { image, width } => {
            let width = (*width).clamp(MIN_IMAGE_WIDTH, MAX_IMAGE_WIDTH);
            let _ = write!(html, "<img src=\"{}\" style=\"width:{}%\" alt=\"\">", escape(image), width);
        }
        BlockKind::Button { text, link, color } => {
            let _ = write!(
                html,
                "<a class=\"btn\" href=\"{}\" style=\"background:{}\">{}</a>",
                escape(link),
                escape(color),
                escape(text),
            );
        }
        BlockKind::Products { category_id, limit } => {
            html.push_str("<div class=\"product-grid\">");
            let limit = usize::try_from(*limit).unwrap_or(0);
            let listed = category_id.and_then(|id| products.get(&id)).map(Vec::as_slice).unwrap_or_default();
            for product in listed.iter().take(limit) {
                render_card(html, product);
            }
            html.push_str("</div>");
        }
    }
    html.push_str("</div>\n");
}

fn render_card(html: &mut String, product: &Product) {
    let _ = write!(html, "<a class=\"product-card\" href=\"{}\">", product.url());
    if let Some(image) = &product.image {
        let _ = write!(html, "<img src=\"{}\" alt=\"{}\">", escape(image), escape(&product.name));
    }
    let _ = write!(html, "<span class=\"name\">{}</span><span class=\"price\">{} грн</span>", escape(&product.name), product.price);
    if let Some(old) = product.old_price.filter(|_| product.is_on_sale()) {
        let _ = write!(html, "<s class=\"old-price\">{old} грн</s>");
    }
    html.push_str("</a>");
}

fn background_style(background: &Background) -> String {
    match background {
        Background::Color(color) => format!("background:{}", escape(color)),
        Background::Gradient(gradient) => format!("background:{}", escape(gradient)),
        Background::Image(url) => format!("background:url('{}') center/cover no-repeat", escape(url)),
    }
}

/// Escapes text for both element content and quoted attribute values.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::landing::Alignment;
    use crate::domain::value_objects::Money;
    use chrono::Utc;

    fn page(blocks: Vec<LandingBlock>) -> LandingPage {
        LandingPage {
            id: 1, title: "Sale".into(), slug: "sale".into(), background: Background::Gradient("linear-gradient(#fff, #000)".into()),
            meta_title: String::new(), meta_description: "Summer".into(), is_active: true, created_at: Utc::now(), updated_at: Utc::now(), blocks,
        }
    }

    fn block(id: i64, order: i32, kind: BlockKind) -> LandingBlock {
        LandingBlock { id, kind, position_top: 10, position_left: 20, order }
    }

    fn text(content: &str) -> BlockKind {
        BlockKind::Text { content: content.into(), font: "Lato".into(), size: 18, color: "#111".into(), alignment: Alignment::Left }
    }

    fn product(id: i64) -> Product {
        Product {
            id, category_id: 2, name: format!("Dress {id}"), description: String::new(), price: Money::from_units(900),
            old_price: Some(Money::from_units(1200)), image: Some(format!("/media/{id}.jpg")), sizes: String::new(), colors: String::new(),
            is_active: true, created_at: Utc::now(),
        }
    }

    #[test]
    fn test_blocks_render_in_order() {
        let p = page(vec![block(1, 2, text("third")), block(2, 0, text("first")), block(3, 2, text("fourth")), block(4, 1, text("second"))]);
        let html = render(&p, &HashMap::new());
        let positions: Vec<usize> = ["first", "second", "third", "fourth"].iter().map(|t| html.find(&format!(">{t}<")).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{html}");
    }

    #[test]
    fn test_user_text_is_escaped() {
        let p = page(vec![
            block(1, 0, text("<script>alert('x')</script>")),
            block(2, 1, BlockKind::Button { text: "Buy & save".into(), link: "/a\"onclick=\"x".into(), color: "#f00".into() }),
        ]);
        let html = render(&p, &HashMap::new());
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"));
        assert!(html.contains("Buy &amp; save"));
        assert!(html.contains("href=\"/a&quot;onclick=&quot;x\""));
    }

    #[test]
    fn test_image_width_is_clamped() {
        let p = page(vec![
            block(1, 0, BlockKind::Image { image: "/a.jpg".into(), width: 500 }),
            block(2, 1, BlockKind::Image { image: "/b.jpg".into(), width: 1 }),
        ]);
        let html = render(&p, &HashMap::new());
        assert!(html.contains("src=\"/a.jpg\" style=\"width:100%\""));
        assert!(html.contains("src=\"/b.jpg\" style=\"width:10%\""));
    }

    #[test]
    fn test_product_grid_respects_limit() {
        let p = page(vec![block(1, 0, BlockKind::Products { category_id: Some(2), limit: 2 })]);
        let products: HashMap<_, _> = [(2, vec![product(1), product(2), product(3)])].into_iter().collect();
        let html = render(&p, &products);
        assert_eq!(html.matches("class=\"product-card\"").count(), 2);
        assert!(html.contains("href=\"/product/1/\""));
        assert!(html.contains("<s class=\"old-price\">1200 грн</s>"));
    }

    #[test]
    fn test_background_and_meta() {
        let html = render(&page(vec![]), &HashMap::new());
        assert!(html.contains("<title>Sale</title>"));
        assert!(html.contains("content=\"Summer\""));
        assert!(html.contains("background:linear-gradient(#fff, #000)"));
    }
}
