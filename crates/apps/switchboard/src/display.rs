//! Plain-text printing of inbox views

use sms::inbox::{
    BadgeView, CheckboxEdge, ConversationListView, Notice, ThreadItem, ThreadView,
};

pub fn print_badge(view: &BadgeView) {
    if view.visible {
        println!("[SMS {}] {}", view.text, view.href);
    } else {
        println!("[SMS] {}", view.href);
    }
}

pub fn print_list(view: &ConversationListView) {
    println!("── Conversations ──");
    if let Some(text) = view.empty_text {
        println!("  {}", text);
        return;
    }
    for row in &view.rows {
        let marker = if row.active { '>' } else { ' ' };
        let unread = row
            .unread
            .map(|n| format!(" ({})", n))
            .unwrap_or_default();
        println!("{} {}{}  <{}>", marker, row.name, unread, row.phone);
        println!("    {} {}", row.arrow, row.preview);
        println!("    {}", row.when);
    }
}

pub fn print_thread(view: &ThreadView) {
    println!("── {} ({}) ──", view.title, view.phone);
    let affordance = &view.selection;
    let mut controls = vec![format!("[{}]", affordance.toggle_label)];
    if let Some(label) = &affordance.attach_label {
        let state = if affordance.attach_enabled { "" } else { " disabled" };
        controls.push(format!("[{}{}]", label, state));
    }
    if affordance.cancel_visible {
        controls.push("[Cancel]".to_string());
    }
    println!("{}", controls.join(" "));
    if view.loading {
        println!("  (loading...)");
    }

    for item in &view.items {
        match item {
            ThreadItem::DateSeparator { label, .. } => println!("  ─── {} ───", label),
            ThreadItem::Bubble(bubble) => {
                let (leading, trailing) = match &bubble.checkbox {
                    Some(checkbox) => {
                        let mark = if checkbox.checked { "[x] " } else { "[ ] " };
                        match checkbox.edge {
                            CheckboxEdge::Leading => (mark, ""),
                            CheckboxEdge::Trailing => ("", mark),
                        }
                    }
                    None => ("", ""),
                };
                let indent = match bubble.direction {
                    sms::Direction::Inbound => "  ",
                    sms::Direction::Outbound => "                ",
                };
                if let Some(sender) = &bubble.sender {
                    println!("{}{}", indent, sender);
                }
                println!(
                    "{}{}{} {}{}  <{}>",
                    indent,
                    leading,
                    bubble.time,
                    bubble.body,
                    if trailing.is_empty() {
                        String::new()
                    } else {
                        format!(" {}", trailing.trim_end())
                    },
                    bubble.id
                );
                if let Some(link) = &bubble.link_label {
                    println!("{}  📎 {}", indent, link);
                }
            }
        }
    }
}

pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        match notice {
            Notice::Toast { message, .. } => println!("✓ {}", message.replace('\n', " | ")),
            Notice::Alert { title, message } => println!("!! {}: {}", title, message),
        }
    }
}
