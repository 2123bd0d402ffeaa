use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitStr, parse_macro_input};

#[proc_macro_derive(KvDocument, attributes(kv))]
pub fn derive_kv_document(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // #[kv(collection = "...")]，缺省时用 snake_case 类型名
    let mut collection = None;
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("kv")) {
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(meta.error("collection name must not be empty"));
                }
                collection = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported kv attribute, expected `collection`"))
            }
        });
        if let Err(e) = parsed {
            return e.to_compile_error().into();
        }
    }
    let collection = collection.unwrap_or_else(|| to_snake_case(&struct_name.to_string()));

    let expanded = quote! {
        impl #impl_generics ::kv_docstore::KvDocument for #struct_name #ty_generics #where_clause {
            fn collection() -> &'static str {
                #collection
            }
        }
    };

    TokenStream::from(expanded)
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let after_lower =
                i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let before_lower = i > 0
                && chars[i - 1].is_uppercase()
                && chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if after_lower || before_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(*c);
        }
    }
    out
}
