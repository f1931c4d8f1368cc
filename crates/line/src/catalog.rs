//! Static menu content: contact details, FAQ answers and the services menus.

use crate::commands::{FaqTopic, ServiceTopic};
use crate::messages::{
    Action, BubbleBuilder, CarouselColumn, CarouselTemplate, FlexText, FontSize, LineMessage,
    Spacing,
};

pub const COMPANY_NAME: &str = "บริษัท เบสท์ เวลล์ พลาสติก จำกัด";
pub const COMPANY_ADDRESS: &str =
    "135/3-4 หมู่ 13 ถ.เพชรเกษม 91 ต.อ้อมน้อย อ.กระทุ่มแบน จ.สมุทรสาคร";
pub const COMPANY_LATITUDE: f64 = 13.697285427411833;
pub const COMPANY_LONGITUDE: f64 = 100.31582319730443;

const SITE_BASE_URL: &str = "https://bestwellplastic.com";
const TAGLINE_COLOR: &str = "#1DB446";
const TAGLINE: [&str; 2] = ["เปลี่ยนไอเดียของคุณให้เป็นจริง", "ออกแบบและผลิตไปกับเรา"];

pub const CONTACT_MENU_TEXT: &str = "📞 ติดต่อเรา\n\nโปรดพิมพ์ FAQ ที่ต้องการ:\nFAQ 1: Email\nFAQ 2: โทรศัพท์\nFAQ 3: เวลาทำการ\nFAQ 4: ที่อยู่\nFAQ 5: พิกัด";
pub const UNKNOWN_FAQ_TEXT: &str = "❌ ไม่พบ FAQ ที่ต้องการ กรุณาพิมพ์ใหม่ เช่น 'FAQ 1'";

pub fn contact_menu() -> LineMessage {
    LineMessage::text(CONTACT_MENU_TEXT)
}

/// Answer for one FAQ entry; `None` falls back to the unknown-topic notice.
pub fn faq_answer(topic: Option<FaqTopic>) -> LineMessage {
    let Some(topic) = topic else {
        return LineMessage::text(UNKNOWN_FAQ_TEXT);
    };

    match topic {
        FaqTopic::Email => LineMessage::text("📧 Email: bestwellplastic@gmail.com"),
        FaqTopic::Phone => LineMessage::text("📞 โทรศัพท์: 02 813 8773"),
        FaqTopic::BusinessHours => LineMessage::text(
            "⏰ เวลาทำการ:\nวันจันทร์ – วันเสาร์\nเวลา 8.00 - 17.00 น.\n(ปิดทำการทุกวันอาทิตย์)",
        ),
        FaqTopic::Address => LineMessage::text(
            "🏠 ที่อยู่:\n135/3 หมู่ 13 ซอยเพชรเกษม 91 แยก12\nต.อ้อมน้อย, อ.กระทุ่มแบน, จ.สมุทรสาคร 74130",
        ),
        FaqTopic::Location => LineMessage::location(
            COMPANY_NAME,
            COMPANY_ADDRESS,
            COMPANY_LATITUDE,
            COMPANY_LONGITUDE,
        ),
    }
}

pub fn services_menu() -> LineMessage {
    let mut bubble = BubbleBuilder::new()
        .text(FlexText::new("สินค้าและบริการ").bold().size(FontSize::Lg).centered())
        .text(
            FlexText::new("โปรดเลือกหนึ่งในตัวเลือกด้านล่าง:")
                .size(FontSize::Sm)
                .margin(Spacing::Md)
                .centered(),
        );
    for (index, topic) in ServiceTopic::ALL.iter().enumerate() {
        let margin = if index == 0 { Spacing::Lg } else { Spacing::Md };
        bubble = bubble.button(Action::echo(topic.label()), margin);
    }

    LineMessage::flex("สินค้าและบริการ", bubble.build())
}

pub fn service_detail(topic: ServiceTopic) -> LineMessage {
    match topic {
        ServiceTopic::OurServices => our_services(),
        ServiceTopic::SampleProducts => sample_products(),
        ServiceTopic::ProductionProcess => production_process(),
    }
}

fn tagline(builder: BubbleBuilder, size: FontSize) -> BubbleBuilder {
    builder.nested(Spacing::Xl, |inner| {
        inner
            .text(FlexText::new(TAGLINE[0]).bold().size(size).centered().color(TAGLINE_COLOR))
            .text(
                FlexText::new(TAGLINE[1])
                    .bold()
                    .size(size)
                    .centered()
                    .margin(Spacing::Md)
                    .color(TAGLINE_COLOR),
            )
    })
}

fn our_services() -> LineMessage {
    let mut bubble = BubbleBuilder::new()
        .text(FlexText::new("บริการของเรา").size(FontSize::Md).bold().centered());
    for line in ["1. ออกแบบและผลิตแม่พิมพ์", "2. รับผลิตชิ้นส่วนพลาสติก", "3. บริการให้คำปรึกษา"] {
        bubble = bubble.text(FlexText::new(line).margin(Spacing::Md));
    }
    let bubble = tagline(bubble.separator(Spacing::Lg), FontSize::Md);

    LineMessage::flex("บริการของเรา", bubble.build())
}

fn production_process() -> LineMessage {
    let mut bubble = BubbleBuilder::new().text(
        FlexText::new("ขั้นตอนการสั่งผลิตและออกแบบแม่พิมพ์").size(FontSize::Sm).bold().centered(),
    );
    for step in [
        "1. เปิด PO (Purchase Order)",
        "2. ชำระเงิน",
        "3. เริ่มการผลิต",
        "4. ใช้ระยะเวลาการผลิต 15-30 วัน",
        "5. บรรจุและจัดส่ง",
    ] {
        bubble = bubble.text(FlexText::new(step).margin(Spacing::Sm));
    }
    let bubble = tagline(bubble.separator(Spacing::Lg), FontSize::Sm);

    LineMessage::flex("Steps to order and design a mold", bubble.build())
}

struct ProductCategory {
    title: &'static str,
    slug: &'static str,
    thumbnail: &'static str,
    text: &'static str,
    background: &'static str,
}

const PRODUCT_CATEGORIES: [ProductCategory; 10] = [
    ProductCategory {
        title: "BEST SELLER",
        slug: "best-seller",
        thumbnail: "2025/03/1678569-247x296.jpg",
        text: "เปลี่ยนแนวคิดให้เป็นบรรจุภัณฑ์ที่จับต้องได้",
        background: "#000000",
    },
    ProductCategory {
        title: "Packaging",
        slug: "packaging",
        thumbnail: "2018/09/packing-247x296.png",
        text: "สร้างสรรค์ดีไซน์ พัฒนาแบรนด์ ผ่าน Packaging ที่ใช่",
        background: "#FFFFFF",
    },
    ProductCategory {
        title: "FAN PART",
        slug: "fanpart",
        thumbnail: "2022/08/fan-cat-copy.jpg",
        text: "ออกแบบเพื่อการใช้งานยาวนาน เย็นได้เต็มประสิทธิภาพ",
        background: "#000000",
    },
    ProductCategory {
        title: "Car Accessory",
        slug: "car-accessory",
        thumbnail: "2018/09/Car-Accessory-247x296.png",
        text: "ออกแบบเพื่อความแกร่ง ผลิตเพื่อความมั่นใจ",
        background: "#000000",
    },
    ProductCategory {
        title: "Pump motor parts",
        slug: "pump-motor-parts",
        thumbnail: "2018/09/pum-247x296.png",
        text: "นวัตกรรมที่พัฒนาเพื่อการทำงานที่เสถียรและทรงพลัง",
        background: "#000000",
    },
    ProductCategory {
        title: "a Christmas tree",
        slug: "spare-a-christmas-tree",
        thumbnail: "2018/09/crismas-247x296.png",
        text: "ส่งต่อความสุขผ่านต้นคริสต์มาสที่สมบูรณ์แบบ",
        background: "#000000",
    },
    ProductCategory {
        title: "Agricultural",
        slug: "agricultural",
        thumbnail: "2018/09/Agricultural-equipment-1-247x296.png",
        text: "ขับเคลื่อนการเกษตรด้วยนวัตกรรมและดีไซน์ล้ำสมัย",
        background: "#000000",
    },
    ProductCategory {
        title: "Auto Parts",
        slug: "auto-parts",
        thumbnail: "2018/09/Auto-Parts-247x296.png",
        text: "ทนทานทุกการใช้งาน ยาวนานทุกการขับเคลื่อน",
        background: "#000000",
    },
    ProductCategory {
        title: "Packing media",
        slug: "packing-media",
        thumbnail: "2021/08/sddsfd-247x296.png",
        text: "แข็งแกร่งทุกชิ้นงาน รองรับทุกสภาวะการใช้งาน",
        background: "#000000",
    },
    ProductCategory {
        title: "Sanitary product",
        slug: "sanitary-product",
        thumbnail: "2018/09/Sanitary-product-247x296.png",
        text: "ก้าวล้ำด้วยเทคโนโลยี สะอาดทุกสัมผัส",
        background: "#000000",
    },
];

fn sample_products() -> LineMessage {
    let columns = PRODUCT_CATEGORIES
        .iter()
        .map(|category| {
            let uri = format!("{SITE_BASE_URL}/product-category/{}/", category.slug);
            CarouselColumn {
                thumbnail_image_url: format!("{SITE_BASE_URL}/wp-content/uploads/{}", category.thumbnail),
                image_background_color: category.background.to_owned(),
                title: category.title.to_owned(),
                text: category.text.to_owned(),
                default_action: Action::uri("View detail", uri.clone()),
                actions: vec![Action::uri("View detail", uri)],
            }
        })
        .collect();

    LineMessage::carousel(
        "this is a carousel template",
        CarouselTemplate {
            columns,
            image_aspect_ratio: "rectangle".to_owned(),
            image_size: "cover".to_owned(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::{contact_menu, faq_answer, service_detail, services_menu, UNKNOWN_FAQ_TEXT};
    use crate::commands::{FaqTopic, ServiceTopic};
    use crate::messages::LineMessage;

    #[test]
    fn contact_menu_lists_all_five_faq_entries() {
        let menu = contact_menu();
        let text = menu.as_text().expect("text message");

        for n in 1..=5 {
            assert!(text.contains(&format!("FAQ {n}:")), "missing FAQ {n}");
        }
    }

    #[test]
    fn faq_location_is_a_location_message() {
        let LineMessage::Location { latitude, longitude, title, .. } =
            faq_answer(Some(FaqTopic::Location))
        else {
            panic!("expected location message");
        };

        assert_eq!(title, "บริษัท เบสท์ เวลล์ พลาสติก จำกัด");
        assert!((latitude - 13.697285427411833).abs() < f64::EPSILON);
        assert!((longitude - 100.31582319730443).abs() < f64::EPSILON);
    }

    #[test]
    fn faq_text_answers_and_unknown_topic() {
        assert!(faq_answer(Some(FaqTopic::Email)).as_text().expect("text").contains("@gmail.com"));
        assert!(faq_answer(Some(FaqTopic::Phone)).as_text().expect("text").contains("02 813 8773"));
        assert_eq!(faq_answer(None).as_text(), Some(UNKNOWN_FAQ_TEXT));
    }

    #[test]
    fn services_menu_has_one_echo_button_per_service() {
        let value = serde_json::to_value(services_menu()).expect("json");
        let contents = value["contents"]["body"]["contents"].as_array().expect("contents");
        let buttons = contents.iter().filter(|c| c["type"] == "button").collect::<Vec<_>>();

        assert_eq!(value["altText"], "สินค้าและบริการ");
        assert_eq!(buttons.len(), 3);
        for (button, topic) in buttons.iter().zip(ServiceTopic::ALL) {
            assert_eq!(button["action"]["type"], "message");
            assert_eq!(button["action"]["text"], topic.label());
        }
        assert_eq!(buttons[0]["margin"], "lg");
        assert_eq!(buttons[2]["margin"], "md");
    }

    #[test]
    fn sample_products_carousel_has_ten_linked_columns() {
        let value =
            serde_json::to_value(service_detail(ServiceTopic::SampleProducts)).expect("json");
        let columns = value["template"]["columns"].as_array().expect("columns");

        assert_eq!(columns.len(), 10);
        assert_eq!(columns[0]["title"], "BEST SELLER");
        assert_eq!(
            columns[2]["defaultAction"]["uri"],
            "https://bestwellplastic.com/product-category/fanpart/"
        );
        assert_eq!(columns[1]["imageBackgroundColor"], "#FFFFFF");
        assert!(columns
            .iter()
            .all(|c| c["thumbnailImageUrl"].as_str().is_some_and(|u| u.starts_with("https://"))));
    }

    #[test]
    fn production_process_lists_five_steps_and_tagline() {
        let value =
            serde_json::to_value(service_detail(ServiceTopic::ProductionProcess)).expect("json");
        let contents = value["contents"]["body"]["contents"].as_array().expect("contents");

        assert_eq!(value["altText"], "Steps to order and design a mold");
        let steps = contents
            .iter()
            .filter(|c| c["type"] == "text" && c["margin"] == "sm")
            .count();
        assert_eq!(steps, 5);
        let tagline = contents.last().expect("tagline box");
        assert_eq!(tagline["type"], "box");
        assert_eq!(tagline["contents"][0]["color"], "#1DB446");
        assert_eq!(tagline["contents"][0]["size"], "sm");
    }

    #[test]
    fn our_services_lists_offerings_before_separator() {
        let value = serde_json::to_value(service_detail(ServiceTopic::OurServices)).expect("json");
        let contents = &value["contents"]["body"]["contents"];

        assert_eq!(contents[0]["text"], "บริการของเรา");
        assert_eq!(contents[1]["text"], "1. ออกแบบและผลิตแม่พิมพ์");
        assert_eq!(contents[4]["type"], "separator");
        assert_eq!(contents[5]["margin"], "xl");
    }
}
