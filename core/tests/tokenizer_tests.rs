use newsdex_core::tokenizer::tokenize;

#[test]
fn it_lowercases_and_splits_on_punctuation() {
    let words = tokenize("El Gobierno, según FUENTES: 'no habrá cambios'.");
    assert_eq!(words, vec!["el", "gobierno", "según", "fuentes", "no", "habrá", "cambios"]);
}

#[test]
fn it_keeps_digits_and_accented_letters() {
    let words = tokenize("COVID-19 llegó a España en 2020");
    assert_eq!(words, vec!["covid", "19", "llegó", "a", "españa", "en", "2020"]);
}

#[test]
fn it_is_idempotent_on_its_own_output() {
    let text = "  Mercados -- caen; el IBEX-35 pierde un 3,2%!  ";
    let once = tokenize(text);
    let twice = tokenize(&once.join(" "));
    assert_eq!(once, twice);
}

#[test]
fn it_keeps_stop_words() {
    let words = tokenize("the and not or");
    assert_eq!(words.len(), 4);
}
