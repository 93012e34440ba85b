// Major arcana, gentle readings. Card ids are 1-based.

use super::DivinationParam;

pub struct TarotCard {
    pub name: &'static str,
    pub meaning: &'static str,
}

pub const TAROT_CARDS: [TarotCard; 22] = [
    TarotCard { name: "The Fool", meaning: "A new beginning, free as a drifting cloud" },
    TarotCard { name: "The Magician", meaning: "You have the power to create, you just haven't noticed it yet" },
    TarotCard { name: "The High Priestess", meaning: "Quiet intuition, the answer is already inside you" },
    TarotCard { name: "The Empress", meaning: "The feeling of being treated gently" },
    TarotCard { name: "The Emperor", meaning: "Order and steadiness, take it slowly" },
    TarotCard { name: "The Hierophant", meaning: "Looking for resonance, you are not alone" },
    TarotCard { name: "The Lovers", meaning: "A choice, or simply liking something" },
    TarotCard { name: "The Chariot", meaning: "You are working your way toward something" },
    TarotCard { name: "Strength", meaning: "Gentleness is stronger than force" },
    TarotCard { name: "The Hermit", meaning: "You need a little time on your own" },
    TarotCard { name: "Wheel of Fortune", meaning: "Everything flows, this too will pass" },
    TarotCard { name: "Justice", meaning: "Deep down you already know the answer" },
    TarotCard { name: "The Hanged Man", meaning: "Look from another angle, it may seem different" },
    TarotCard { name: "Death", meaning: "Something is slowly being let go" },
    TarotCard { name: "Temperance", meaning: "Balance, no need to rush" },
    TarotCard { name: "The Devil", meaning: "Some attachments can be loosened a little" },
    TarotCard { name: "The Tower", meaning: "A sudden change, and things will be rebuilt" },
    TarotCard { name: "The Star", meaning: "Hope is a lovely thing to hold" },
    TarotCard { name: "The Moon", meaning: "Blurry and uneasy, but the sky will brighten" },
    TarotCard { name: "The Sun", meaning: "Warmth and clarity" },
    TarotCard { name: "Judgement", meaning: "Waking up, getting to know yourself again" },
    TarotCard { name: "The World", meaning: "Completion, which is also a new beginning" },
];

pub fn card(id: i64) -> Option<&'static TarotCard> {
    if !(1..=22).contains(&id) {
        return None;
    }
    TAROT_CARDS.get((id - 1) as usize)
}

pub fn single(id: i64) -> Option<String> {
    let card = card(id)?;
    Some(format!("You drew {}. {}.", card.name, card.meaning))
}

/// Past / present / future, in the order the ids were given
pub fn three(ids: [i64; 3]) -> Option<String> {
    let past = card(ids[0])?;
    let present = card(ids[1])?;
    let future = card(ids[2])?;
    Some(format!(
        "Past: {} - {}\nPresent: {} - {}\nFuture: {} - {}",
        past.name, past.meaning, present.name, present.meaning, future.name, future.meaning
    ))
}

pub fn reading(params: &[DivinationParam]) -> Option<String> {
    let ids: Vec<i64> = params.iter().map(DivinationParam::as_number).collect::<Option<_>>()?;
    match ids.as_slice() {
        [id] => single(*id),
        [a, b, c] => three([*a, *b, *c]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DivinationParam::Number;

    #[test]
    fn test_out_of_range_ids_have_no_entry() {
        assert!(single(0).is_none());
        assert!(single(23).is_none());
        assert!(single(-4).is_none());
        assert!(three([1, 2, 99]).is_none());
    }

    #[test]
    fn test_single_card_template() {
        assert_eq!(
            single(8).unwrap(),
            "You drew The Chariot. You are working your way toward something."
        );
    }

    #[test]
    fn test_three_cards_follow_input_order() {
        let text = reading(&[Number(18), Number(1), Number(22)]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Past: The Star"));
        assert!(lines[1].starts_with("Present: The Fool"));
        assert!(lines[2].starts_with("Future: The World"));
    }

    #[test]
    fn test_wrong_arity_or_type_has_no_entry() {
        assert!(reading(&[]).is_none());
        assert!(reading(&[Number(1), Number(2)]).is_none());
        assert!(reading(&[Number(1), Number(2), Number(3), Number(4)]).is_none());
        assert!(reading(&[DivinationParam::Text("moon".into())]).is_none());
    }

    #[test]
    fn test_every_card_id_resolves() {
        for id in 1..=22 {
            assert!(single(id).is_some(), "card {} missing", id);
        }
    }
}
