use bassline_core::tokenizer::{normalize, tokenize};

#[test]
fn it_lowercases_and_strips_outside_alphabet() {
    let toks = tokenize("Écoute: Autumn Leaves (page 12)!");
    assert_eq!(toks, vec!["écoute", "autumn", "leaves", "page", "12"]);
}

#[test]
fn it_keeps_accented_latin_letters() {
    let toks = tokenize("Gamme mineure mélodique — étude n°4");
    assert_eq!(toks, vec!["gamme", "mineure", "mélodique", "étude", "n", "4"]);
}

#[test]
fn it_keeps_hyphens_and_apostrophes_inside_words() {
    let toks = tokenize("walking-bass l'accord");
    assert_eq!(toks, vec!["walking-bass", "l'accord"]);
}

#[test]
fn normalize_is_idempotent() {
    let once = normalize("  Slap & Pop!!  Funk   ");
    assert_eq!(normalize(&once), once);
}

#[test]
fn whitespace_runs_collapse_to_single_spaces() {
    assert_eq!(normalize("blues \t en\n\n la"), "blues en la");
}
