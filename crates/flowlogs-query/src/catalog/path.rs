/// Decode the `trafficPath` field.
///
/// The field is only reported for egress traffic; gating on direction is up
/// to the caller. Unknown codes decode to an empty label.
pub fn traffic_path_label(code: &str) -> &'static str {
    match code {
        "1" => "vpc",
        "2" => "internet gateway/vpc endpoint",
        "3" => "virtual private gateway",
        "4" => "intra-region vpc peering",
        "5" => "inter-region vpc peering",
        "6" => "local gateway",
        // nitro-based instances only
        "7" => "vpc endpoint",
        "8" => "internet gateway",
        _ => "",
    }
}
