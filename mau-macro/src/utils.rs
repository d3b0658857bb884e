use syn::{Attribute, Type};

/// Placement of one field, as written in its `#[field(..)]` attribute.
#[derive(Debug, Default)]
pub(super) struct FieldAttr {
    pub width: Option<usize>,
    pub lsb: Option<usize>,
}

pub(super) fn get_field_attr(attrs: &[Attribute]) -> FieldAttr {
    let mut out = FieldAttr::default();
    for attr in attrs {
        let nvs = match attr.parse_meta() {
            Ok(syn::Meta::List(nvs)) if nvs.path.is_ident("field") => nvs,
            _ => continue,
        };
        for nv in nvs.nested.iter() {
            let nv = match nv {
                syn::NestedMeta::Meta(syn::Meta::NameValue(nv)) => nv,
                nv => panic!("expected `name = value`, found {:?}", nv),
            };
            let value = match &nv.lit {
                syn::Lit::Int(value) => value.base10_parse::<usize>().unwrap_or_else(|e| panic!("{}", e)),
                lit => panic!("expected integer, found {:?}", lit),
            };
            match nv.path.get_ident().map(|ident| ident.to_string()).as_deref() {
                Some("width") => out.width = Some(value),
                Some("lsb") => out.lsb = Some(value),
                _ => panic!("unknown field attribute {:?}", nv.path),
            }
        }
    }
    out
}

pub(super) fn is_bool_type(ty: &Type) -> bool {
    if let Type::Path(ty_path) = ty {
        let segments = &ty_path.path.segments;
        segments.len() == 1 && segments[0].ident == "bool"
    } else {
        false
    }
}

pub(super) const fn low_mask(width: usize) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1 << width) - 1
    }
}
