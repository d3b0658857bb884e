use proc_macro::{self, TokenStream};
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

use super::utils::{get_field_attr, is_bool_type, low_mask};

const MAX_WIDTH: usize = 128;

pub fn derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let name = &ast.ident;
    let fields = match ast.data {
        syn::Data::Struct(syn::DataStruct { fields: syn::Fields::Named(syn::FieldsNamed { ref named, .. }), .. }) => {
            named
        }
        _ => panic!("{name}: Register can only be derived for structs with named fields"),
    };

    // (field, type, lsb, mask), in declaration order.
    let mut layout = Vec::new();
    let mut next = 0;
    for f in fields.iter() {
        let field = f.ident.as_ref().unwrap();
        let attr = get_field_attr(&f.attrs);
        let width = match attr.width {
            Some(width) => width,
            None if is_bool_type(&f.ty) => 1,
            None => panic!("{name}::{field}: missing #[field(width = N)]"),
        };
        assert!(width > 0, "{name}::{field}: zero-width field");
        let lsb = attr.lsb.unwrap_or(next);
        assert!(lsb >= next, "{name}::{field}: bit {lsb} overlaps the previous field");
        assert!(lsb + width <= MAX_WIDTH, "{name}::{field}: ends at bit {}, beyond {MAX_WIDTH}", lsb + width);
        next = lsb + width;
        layout.push((field, &f.ty, lsb, low_mask(width)));
    }
    let total = next;

    let unpack_fields = layout.iter().map(|(field, ty, lsb, mask)| {
        quote! { #field: <#ty as FieldValue>::from_bits((raw >> #lsb) & #mask) }
    });

    let pack_fields = layout.iter().map(|(field, ty, lsb, mask)| {
        quote! { | ((<#ty as FieldValue>::to_bits(&self.#field) & #mask) << #lsb) }
    });

    let expanded = quote! {
        impl #impl_generics RegisterLayout for #name #ty_generics #where_clause {
            const WIDTH: usize = #total;
            fn unpack(raw: u128) -> Self {
                Self {
                    #(#unpack_fields,)*
                }
            }
            fn pack(&self) -> u128 {
                0u128 #(#pack_fields)*
            }
        }
    };

    expanded.into()
}
