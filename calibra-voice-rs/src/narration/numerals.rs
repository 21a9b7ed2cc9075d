//! Integer → Brazilian Portuguese cardinal words.

const UNITS: [&str; 10] = [
    "", "um", "dois", "três", "quatro", "cinco", "seis", "sete", "oito", "nove",
];

const TEENS: [&str; 10] = [
    "dez", "onze", "doze", "treze", "quatorze", "quinze", "dezesseis", "dezessete", "dezoito",
    "dezenove",
];

const TENS: [&str; 10] = [
    "", "", "vinte", "trinta", "quarenta", "cinquenta", "sessenta", "setenta", "oitenta",
    "noventa",
];

const HUNDREDS: [&str; 10] = [
    "",
    "cento",
    "duzentos",
    "trezentos",
    "quatrocentos",
    "quinhentos",
    "seiscentos",
    "setecentos",
    "oitocentos",
    "novecentos",
];

/// Spell out any `i64`, e.g. `1_234_567` →
/// "um milhão duzentos e trinta e quatro mil quinhentos e sessenta e sete".
pub fn to_words(n: i64) -> String {
    if n == 0 {
        return "zero".to_string();
    }
    if n < 0 {
        return format!("menos {}", unsigned_words(n.unsigned_abs()));
    }
    unsigned_words(n.unsigned_abs())
}

/// Caller guarantees `n > 0`.
fn unsigned_words(n: u64) -> String {
    let millions = n / 1_000_000;
    let thousands = (n / 1_000) % 1_000;
    let remainder = n % 1_000;

    let mut segments: Vec<String> = Vec::with_capacity(3);

    match millions {
        0 => {}
        1 => segments.push("um milhão".to_string()),
        m => segments.push(format!("{} milhões", unsigned_words(m))),
    }

    match thousands {
        0 => {}
        1 => segments.push("mil".to_string()),
        t => segments.push(format!("{} mil", group_words(t))),
    }

    if remainder > 0 {
        let words = group_words(remainder);
        if remainder < 100 && !segments.is_empty() {
            segments.push(format!("e {words}"));
        } else {
            segments.push(words);
        }
    }

    segments.join(" ")
}

/// Words for 1..=999.
fn group_words(n: u64) -> String {
    if n == 100 {
        return "cem".to_string();
    }

    let hundreds = HUNDREDS[(n / 100) as usize];
    let tens_units = below_hundred(n % 100);

    match (hundreds.is_empty(), tens_units.is_empty()) {
        (true, _) => tens_units,
        (false, true) => hundreds.to_string(),
        (false, false) => format!("{hundreds} e {tens_units}"),
    }
}

fn below_hundred(n: u64) -> String {
    match n {
        0 => String::new(),
        1..=9 => UNITS[n as usize].to_string(),
        10..=19 => TEENS[(n - 10) as usize].to_string(),
        _ => {
            let tens = TENS[(n / 10) as usize];
            match n % 10 {
                0 => tens.to_string(),
                unit => format!("{tens} e {}", UNITS[unit as usize]),
            }
        }
    }
}
