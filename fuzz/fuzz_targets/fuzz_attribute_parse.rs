#![no_main]

use libfuzzer_sys::fuzz_target;
use mongowire_scram::auth::attributes;

fuzz_target!(|data: &str| {
    let fields = attributes::parse(data);

    // whatever parsed must survive a format/parse round trip, as long as no
    // value carries an embedded comma
    if fields.values().all(|value| !value.contains(',')) {
        let pairs: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, *v)).collect();
        let formatted = attributes::format(&pairs);
        assert_eq!(fields, attributes::parse(&formatted));
    }

    let escaped = attributes::escape_username(data);
    if !data.contains('=') && !data.contains(',') {
        assert_eq!(escaped, data);
    }
});
